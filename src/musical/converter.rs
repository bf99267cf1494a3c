//! Piecewise-linear conversions over tempo maps and bar signatures.

use serde::{Deserialize, Serialize};

/// A point of the tempo map: at `time_position` seconds the song is at `quarter_position`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct TempoEntry {
    pub time_position: f64,
    pub quarter_position: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct BarSignature {
    /// In quarters.
    pub position: f64,
    pub numerator: u32,
    pub denominator: u32,
}

/// Converts between seconds and quarters. Needs at least two entries, monotonic in both
/// fields; outside the map the outermost segment is extrapolated.
#[derive(Clone, Copy, Debug)]
pub struct TempoConverter<'a> {
    entries: &'a [TempoEntry],
}

impl TempoConverter<'static> {
    /// 120 bpm from zero, used when no musical context is available.
    pub const CONSTANT_120_BPM: Self = Self {
        entries: &[
            TempoEntry {
                time_position: 0.0,
                quarter_position: 0.0,
            },
            TempoEntry {
                time_position: 0.5,
                quarter_position: 1.0,
            },
        ],
    };
}

impl<'a> TempoConverter<'a> {
    pub fn new(entries: &'a [TempoEntry]) -> Option<Self> {
        (entries.len() >= 2).then_some(Self { entries })
    }

    pub fn entries(&self) -> &'a [TempoEntry] {
        self.entries
    }

    /// The two entries to interpolate between: the first entry after `value` (never the
    /// first one) and its predecessor.
    fn bracket(&self, value: f64, key: impl Fn(&TempoEntry) -> f64) -> (&'a TempoEntry, &'a TempoEntry) {
        let last = self.entries.len() - 1;
        let index = self.entries[..last].partition_point(|e| key(e) <= value);
        let index = index.max(1);
        (&self.entries[index - 1], &self.entries[index])
    }

    pub fn quarter_for_time(&self, time: f64) -> f64 {
        let (left, right) = self.bracket(time, |e| e.time_position);
        let quarters_per_second = (right.quarter_position - left.quarter_position)
            / (right.time_position - left.time_position);
        left.quarter_position + (time - left.time_position) * quarters_per_second
    }

    pub fn time_for_quarter(&self, quarter: f64) -> f64 {
        let (left, right) = self.bracket(quarter, |e| e.quarter_position);
        let seconds_per_quarter = (right.time_position - left.time_position)
            / (right.quarter_position - left.quarter_position);
        left.time_position + (quarter - left.quarter_position) * seconds_per_quarter
    }
}

fn quarters_to_beats(signature: &BarSignature, quarters: f64) -> f64 {
    signature.denominator as f64 * quarters / 4.0
}

fn beats_to_quarters(signature: &BarSignature, beats: f64) -> f64 {
    4.0 * beats / signature.denominator as f64
}

/// Bars that partially fill a span still count as one; this guards exact fits
/// against rounding up.
const BAR_EPSILON: f64 = 1.0e-9;

/// Beat and bar arithmetic over a list of bar signatures ordered by position.
/// Beat zero is at the first signature.
#[derive(Clone, Copy, Debug)]
pub struct BarSignatureConverter<'a> {
    signatures: &'a [BarSignature],
}

impl BarSignatureConverter<'static> {
    pub const FOUR_FOUR: Self = Self {
        signatures: &[BarSignature {
            position: 0.0,
            numerator: 4,
            denominator: 4,
        }],
    };
}

impl<'a> BarSignatureConverter<'a> {
    pub fn new(signatures: &'a [BarSignature]) -> Option<Self> {
        (!signatures.is_empty()).then_some(Self { signatures })
    }

    pub fn signatures(&self) -> &'a [BarSignature] {
        self.signatures
    }

    pub fn bar_signature_for_quarter(&self, quarter: f64) -> BarSignature {
        let index = self
            .signatures
            .partition_point(|s| s.position <= quarter);
        self.signatures[index.saturating_sub(1)]
    }

    /// Index of the signature in effect at `quarter` and the beat it starts on.
    fn signature_and_start_beat(&self, quarter: f64) -> (usize, f64) {
        let mut index = 0;
        let mut beat = 0.0;
        if self.signatures[0].position < quarter {
            while let Some(next) = self.signatures.get(index + 1) {
                if next.position > quarter {
                    break;
                }
                let current = &self.signatures[index];
                beat += quarters_to_beats(current, next.position - current.position);
                index += 1;
            }
        }
        (index, beat)
    }

    pub fn beat_for_quarter(&self, quarter: f64) -> f64 {
        let (index, start_beat) = self.signature_and_start_beat(quarter);
        let signature = &self.signatures[index];
        start_beat + quarters_to_beats(signature, quarter - signature.position)
    }

    pub fn quarter_for_beat(&self, beat: f64) -> f64 {
        let mut index = 0;
        let mut current_beat = 0.0;
        if 0.0 < beat {
            while let Some(next) = self.signatures.get(index + 1) {
                let current = &self.signatures[index];
                let next_beat =
                    current_beat + quarters_to_beats(current, next.position - current.position);
                if beat < next_beat {
                    break;
                }
                current_beat = next_beat;
                index += 1;
            }
        }
        let signature = &self.signatures[index];
        signature.position + beats_to_quarters(signature, beat - current_beat)
    }

    /// Beats since the last downbeat, in `[0, numerator)`.
    pub fn beat_distance_from_bar_start_for_quarter(&self, quarter: f64) -> f64 {
        let signature = self.bar_signature_for_quarter(quarter);
        let beats = quarters_to_beats(&signature, quarter - signature.position);
        beats.rem_euclid(signature.numerator as f64)
    }

    /// Zero-based bar containing `quarter`. Every signature change starts a new bar.
    pub fn bar_index_for_quarter(&self, quarter: f64) -> i32 {
        let mut bars = 0.0;
        let mut index = 0;
        if self.signatures[0].position < quarter {
            while let Some(next) = self.signatures.get(index + 1) {
                if next.position > quarter {
                    break;
                }
                let current = &self.signatures[index];
                let span_bars = quarters_to_beats(current, next.position - current.position)
                    / current.numerator as f64;
                bars += (span_bars - BAR_EPSILON).ceil().max(0.0);
                index += 1;
            }
        }
        let signature = &self.signatures[index];
        let beats_since_start = quarters_to_beats(signature, quarter - signature.position);
        (bars + (beats_since_start / signature.numerator as f64).floor()) as i32
    }
}
