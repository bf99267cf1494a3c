//! Host transport: the play head shared with the audio thread and a stand-in host that
//! moves it.
//!
//! The play head is a sequence lock over atomics. There is exactly one writer
//! ([`PlayHeadWriter`], not cloneable); readers on the UI thread retry until they see the
//! same even sequence number before and after reading.

use crate::view::PlaybackController;
use atomic_float::AtomicF64;
use std::sync::atomic::{fence, AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayHeadState {
    pub time_in_seconds: f64,
    pub is_playing: bool,
}

#[derive(Debug, Default)]
pub struct PlayHead {
    sequence: AtomicU64,
    time: AtomicF64,
    playing: AtomicBool,
}

impl PlayHead {
    pub fn new() -> (Arc<Self>, PlayHeadWriter) {
        let play_head = Arc::new(Self::default());
        let writer = PlayHeadWriter {
            play_head: Arc::clone(&play_head),
        };
        (play_head, writer)
    }

    /// A consistent snapshot. Never blocks the writer.
    pub fn read(&self) -> PlayHeadState {
        loop {
            let before = self.sequence.load(Ordering::Acquire);
            if before & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let state = PlayHeadState {
                time_in_seconds: self.time.load(Ordering::Relaxed),
                is_playing: self.playing.load(Ordering::Relaxed),
            };
            fence(Ordering::Acquire);
            if self.sequence.load(Ordering::Relaxed) == before {
                return state;
            }
        }
    }

    pub fn time_in_seconds(&self) -> f64 {
        self.read().time_in_seconds
    }
}

/// The single writing side of a [`PlayHead`].
#[derive(Debug)]
pub struct PlayHeadWriter {
    play_head: Arc<PlayHead>,
}

impl PlayHeadWriter {
    pub fn write(&mut self, state: PlayHeadState) {
        let play_head = &self.play_head;
        let sequence = play_head.sequence.load(Ordering::Relaxed);
        play_head.sequence.store(sequence.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        play_head.time.store(state.time_in_seconds, Ordering::Relaxed);
        play_head.playing.store(state.is_playing, Ordering::Relaxed);
        play_head.sequence.store(sequence.wrapping_add(2), Ordering::Release);
    }

    pub fn last_written(&self) -> PlayHeadState {
        self.play_head.read()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransportCommand {
    SetPosition(f64),
    Start,
    Stop,
    Quit,
}

/// Sends transport requests to the host thread.
#[derive(Clone, Debug)]
pub struct TransportController {
    sender: mpsc::Sender<TransportCommand>,
}

impl TransportController {
    fn send(&self, command: TransportCommand) {
        if self.sender.send(command).is_err() {
            log::warn!("transport thread is gone, dropped {command:?}");
        }
    }
    pub fn quit(&self) {
        self.send(TransportCommand::Quit);
    }
}

impl PlaybackController for TransportController {
    fn request_set_playback_position(&self, time_in_seconds: f64) {
        self.send(TransportCommand::SetPosition(time_in_seconds));
    }
    fn request_start_playback(&self) {
        self.send(TransportCommand::Start);
    }
    fn request_stop_playback(&self) {
        self.send(TransportCommand::Stop);
    }
}

pub const HOST_TICK: Duration = Duration::from_millis(5);

/// Plays the role of the host's audio thread: follows transport requests and advances
/// the play head in real time while playing.
pub fn spawn_host_transport(mut writer: PlayHeadWriter) -> (TransportController, JoinHandle<()>) {
    let (sender, receiver) = mpsc::channel();
    let handle = std::thread::spawn(move || {
        let mut state = writer.last_written();
        let mut last_tick = Instant::now();
        loop {
            match receiver.recv_timeout(HOST_TICK) {
                Ok(TransportCommand::SetPosition(time)) => state.time_in_seconds = time,
                Ok(TransportCommand::Start) => state.is_playing = true,
                Ok(TransportCommand::Stop) => state.is_playing = false,
                Ok(TransportCommand::Quit) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => {}
            }
            let now = Instant::now();
            if state.is_playing {
                state.time_in_seconds += now.duration_since(last_tick).as_secs_f64();
            }
            last_tick = now;
            writer.write(state);
        }
        log::debug!("host transport stopped");
    });
    (TransportController { sender }, handle)
}
