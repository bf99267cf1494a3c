extern crate log;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, OnceLock,
    },
};

/// Lines kept for the log panel, newest first.
pub const MAX_LINES: usize = 1000;

pub struct Logger {
    pub enabled: AtomicBool,
    pub data: Arc<Mutex<VecDeque<(String, log::Level)>>>,
}
impl Logger {
    pub fn new() -> Self {
        let data = Arc::new(Mutex::new(VecDeque::new()));

        Self {
            enabled: AtomicBool::new(true),
            data,
        }
    }
    pub fn get_color(level: log::Level) -> egui::Color32 {
        match level {
            log::Level::Error => egui::Color32::RED,
            log::Level::Warn => egui::Color32::YELLOW,
            log::Level::Info => egui::Color32::WHITE,
            log::Level::Debug => egui::Color32::DEBUG_COLOR,
            log::Level::Trace => egui::Color32::BLUE,
        }
    }
    /// Copies of the kept lines, newest first.
    pub fn lines(&self) -> Vec<(String, log::Level)> {
        self.data
            .lock()
            .map(|lines| lines.iter().cloned().collect())
            .unwrap_or_default()
    }
}
impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}
impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.enabled.load(Ordering::Relaxed) && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // the ui thread may be reading the lines; dropping one is fine
        if let Ok(mut txt) = self.data.try_lock() {
            let t = format!(
                "{}:{} -- {}",
                record.level(),
                record.target(),
                record.args()
            );
            println!("{}", t);
            txt.push_front((t, record.level()));
            txt.truncate(MAX_LINES);
        }
    }

    fn flush(&self) {
        if let Ok(mut txt) = self.data.try_lock() {
            txt.clear();
        }
    }
}
pub static GLOBAL_LOGGER: OnceLock<Logger> = OnceLock::new();

/// Installs [`GLOBAL_LOGGER`] as the `log` backend. Later calls only change the level.
pub fn init(level: log::LevelFilter) {
    let logger = GLOBAL_LOGGER.get_or_init(Logger::new);
    if log::set_logger(logger).is_err() {
        log::debug!("logger already installed");
    }
    log::set_max_level(level);
}

#[cfg(test)]
mod test {
    use super::*;
    use log::Log;

    #[test]
    fn keeps_newest_first_and_truncates() {
        log::set_max_level(log::LevelFilter::Trace);
        let logger = Logger::new();
        for i in 0..(MAX_LINES + 5) {
            logger.log(
                &log::Record::builder()
                    .level(log::Level::Warn)
                    .target("test")
                    .args(format_args!("line {i}"))
                    .build(),
            );
        }
        let lines = logger.lines();
        assert_eq!(lines.len(), MAX_LINES);
        assert_eq!(lines[0].0, format!("WARN:test -- line {}", MAX_LINES + 4));
        assert_eq!(lines[0].1, log::Level::Warn);

        logger.enabled.store(false, Ordering::Relaxed);
        logger.log(
            &log::Record::builder()
                .level(log::Level::Error)
                .args(format_args!("dropped"))
                .build(),
        );
        assert_eq!(logger.lines().len(), MAX_LINES);
        logger.flush();
        assert!(logger.lines().is_empty());
    }
}
