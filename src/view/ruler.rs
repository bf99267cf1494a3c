//! Seconds, beats and chords above the tracks. Layout only; painting is left to the GUI.

use crate::musical::MusicalContextAdapter;
use crate::timeline::{PixelMapper, TimeRange, TimelineViewport};

pub const NO_MUSICAL_CONTEXT: &str = "No musical context found in document!";

pub const LIGHT_LINE_WIDTH: i32 = 1;
pub const HEAVY_LINE_WIDTH: i32 = 3;
/// Zoomed out this far a ruler is left empty.
pub const MAX_TICKS: usize = 10_000;

/// A horizontal strip of the rulers area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Band {
    pub y: i32,
    pub height: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RulerBands {
    pub chords: Band,
    pub beats: Band,
    pub seconds: Band,
}

impl RulerBands {
    /// Chords take the top third, the rest is split between beats and seconds.
    pub fn new(height: i32) -> Self {
        let height = height.max(0);
        let chords = Band {
            y: 0,
            height: height / 3,
        };
        let beats = Band {
            y: chords.height,
            height: (height - chords.height) / 2,
        };
        let seconds = Band {
            y: beats.y + beats.height,
            height: height - chords.height - beats.height,
        };
        Self {
            chords,
            beats,
            seconds,
        }
    }
}

/// A filled rectangle in rulers coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Tick {
    pub fn is_heavy(&self) -> bool {
        self.width == HEAVY_LINE_WIDTH
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChordSegment {
    pub x: i32,
    pub right: i32,
    pub name: String,
    pub color: [u8; 3],
}

#[derive(Clone, Debug, PartialEq)]
pub enum RulersContent {
    /// Nothing to convert with, show this text instead.
    Placeholder(&'static str),
    Rulers {
        seconds: Vec<Tick>,
        beats: Vec<Tick>,
        chords: Vec<ChordSegment>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RulersLayout {
    pub width: i32,
    pub bands: RulerBands,
    pub content: RulersContent,
}

fn seconds_ticks<M: PixelMapper>(viewport: &TimelineViewport<M>, visible: TimeRange, band: Band) -> Vec<Tick> {
    let first = visible.start.ceil() as i64;
    let last = visible.end.floor() as i64;
    if last < first || (last - first) as usize >= MAX_TICKS {
        return vec![];
    }
    (first..=last)
        .map(|time| {
            let width = if time.rem_euclid(60) == 0 {
                HEAVY_LINE_WIDTH
            } else {
                LIGHT_LINE_WIDTH
            };
            let height = if time.rem_euclid(10) == 0 {
                band.height
            } else {
                band.height / 2
            };
            Tick {
                x: viewport.pixel_for_position(time as f64) - width / 2,
                y: band.y + band.height - height,
                width,
                height,
            }
        })
        .collect()
}

fn beat_ticks<M: PixelMapper>(
    viewport: &TimelineViewport<M>,
    adapter: &MusicalContextAdapter,
    visible: TimeRange,
    band: Band,
) -> Vec<Tick> {
    let Some(map) = adapter.musical_map() else {
        return vec![];
    };
    let beat_for_time = |t: f64| map.bars.beat_for_quarter(map.tempo.quarter_for_time(t));
    let first = beat_for_time(visible.start).ceil() as i64;
    let last = beat_for_time(visible.end).floor() as i64;
    if last < first || (last - first) as usize >= MAX_TICKS {
        return vec![];
    }
    (first..=last)
        .map(|beat| {
            let quarter = map.bars.quarter_for_beat(beat as f64);
            let time = map.tempo.time_for_quarter(quarter);
            let signature = map.bars.bar_signature_for_quarter(quarter);
            let signature_start_beat = map.bars.beat_for_quarter(signature.position).round() as i64;
            let is_downbeat = (beat - signature_start_beat).rem_euclid(signature.numerator as i64) == 0;
            Tick {
                x: viewport.pixel_for_position(time),
                y: band.y,
                width: if is_downbeat {
                    HEAVY_LINE_WIDTH
                } else {
                    LIGHT_LINE_WIDTH
                },
                height: band.height,
            }
        })
        .collect()
}

fn chord_segments<M: PixelMapper>(
    viewport: &TimelineViewport<M>,
    adapter: &MusicalContextAdapter,
    visible: TimeRange,
    width: i32,
) -> Vec<ChordSegment> {
    let Some(map) = adapter.musical_map() else {
        return vec![];
    };
    let mut segments = vec![];
    for (i, chord) in map.chords.iter().enumerate() {
        if chord.is_no_chord() {
            continue;
        }
        let start = map.tempo.time_for_quarter(chord.position);
        if start >= visible.end {
            break;
        }
        let right = match map.chords.get(i + 1) {
            Some(next) => {
                let next_start = map.tempo.time_for_quarter(next.position);
                if next_start < visible.start {
                    continue;
                }
                viewport.pixel_for_position(next_start)
            }
            None => width,
        };
        segments.push(ChordSegment {
            x: viewport.pixel_for_position(start),
            right,
            name: chord.name(),
            color: chord.color(),
        });
    }
    segments
}

/// Lays out the rulers for the viewport's visible range. `width` and `height` are the
/// size of the rulers area; x positions are relative to its left edge.
pub fn layout_rulers<M: PixelMapper>(
    viewport: &TimelineViewport<M>,
    adapter: &MusicalContextAdapter,
    width: i32,
    height: i32,
) -> RulersLayout {
    let bands = RulerBands::new(height);
    let content = if adapter.can_tempo_map() {
        let visible = viewport.visible_range();
        RulersContent::Rulers {
            seconds: seconds_ticks(viewport, visible, bands.seconds),
            beats: beat_ticks(viewport, adapter, visible, bands.beats),
            chords: chord_segments(viewport, adapter, visible, width),
        }
    } else {
        RulersContent::Placeholder(NO_MUSICAL_CONTEXT)
    };
    RulersLayout {
        width,
        bands,
        content,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{Document, MusicalContextId};
    use crate::timeline::SecondsPixelMapper;

    fn viewport(visible: TimeRange) -> TimelineViewport<SecondsPixelMapper> {
        let mut viewport = TimelineViewport::new(SecondsPixelMapper::new());
        viewport.set_size(1200, 60);
        viewport.set_timeline_range(TimeRange::new(-1.0, 120.0));
        viewport.set_visible_range(visible, None);
        viewport
    }

    #[test]
    fn bands_split_height() {
        let bands = RulerBands::new(60);
        assert_eq!(bands.chords, Band { y: 0, height: 20 });
        assert_eq!(bands.beats, Band { y: 20, height: 20 });
        assert_eq!(bands.seconds, Band { y: 40, height: 20 });
        let bands = RulerBands::new(31);
        assert_eq!(bands.chords.height + bands.beats.height + bands.seconds.height, 31);
    }

    #[test]
    fn placeholder_without_musical_context() {
        let mut document = Document::demo();
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&document);
        document.begin_editing();
        document.remove_musical_context(MusicalContextId(1));
        document.end_editing();
        for event in document.drain_events() {
            adapter.handle_event(&document, &event);
        }
        let layout = layout_rulers(&viewport(TimeRange::new(0.0, 12.0)), &adapter, 1200, 60);
        assert_eq!(layout.content, RulersContent::Placeholder(NO_MUSICAL_CONTEXT));
    }

    #[test]
    fn seconds_and_beats() {
        let document = Document::demo();
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&document);
        let layout = layout_rulers(&viewport(TimeRange::new(0.0, 12.0)), &adapter, 1200, 60);
        let RulersContent::Rulers { seconds, beats, chords } = layout.content else {
            panic!("expected rulers");
        };
        assert_eq!(seconds.len(), 13);
        // zero is a minute boundary
        assert!(seconds[0].is_heavy());
        assert_eq!(seconds[0].height, 20);
        assert_eq!(seconds[1].height, 10);
        assert_eq!(seconds[10].height, 20);
        assert_eq!(seconds[1].x, 100);

        // 120 bpm: two beats per second, downbeat every four
        assert_eq!(beats.len(), 25);
        assert_eq!(beats[2].x, 100);
        let heavy: Vec<_> = beats.iter().map(Tick::is_heavy).collect();
        assert!(heavy[0] && heavy[4] && heavy[8]);
        assert!(!heavy[1] && !heavy[3]);

        // a chord per bar, the one starting at 12 s is not visible
        assert_eq!(chords.len(), 6);
        assert_eq!(chords[0].x, 0);
        assert_eq!(chords[0].right, 200);
        assert_eq!(chords[0].name, "C");
    }

    #[test]
    fn downbeats_follow_signature_change() {
        let document = Document::demo();
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&document);
        // 3/4 from quarter 32, which is 16 s
        let layout = layout_rulers(&viewport(TimeRange::new(16.0, 22.0)), &adapter, 1200, 60);
        let RulersContent::Rulers { beats, .. } = layout.content else {
            panic!("expected rulers");
        };
        let heavy: Vec<_> = beats.iter().map(Tick::is_heavy).collect();
        assert!(heavy[0] && heavy[3] && heavy[6]);
        assert!(!heavy[1] && !heavy[2] && !heavy[4]);
    }

    #[test]
    fn chords_before_visible_range_are_skipped() {
        let document = Document::demo();
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&document);
        let layout = layout_rulers(&viewport(TimeRange::new(5.0, 9.0)), &adapter, 1200, 60);
        let RulersContent::Rulers { chords, .. } = layout.content else {
            panic!("expected rulers");
        };
        // bars at 4, 6 and 8 s
        assert_eq!(chords.len(), 3);
        assert!(chords[0].x < 0);
    }
}
