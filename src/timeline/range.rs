use serde::{Deserialize, Serialize};

/// An interval on the timeline in base units (seconds or quarters).
/// `start` may be negative to allow pre-roll. A zero-length range means "no content yet".
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub const EMPTY: TimeRange = TimeRange {
        start: 0.0,
        end: 0.0,
    };

    pub fn new(start: f64, end: f64) -> Self {
        debug_assert!(end >= start, "range end {end} is before start {start}");
        Self {
            start,
            end: end.max(start),
        }
    }
    /// Builds a range from two positions in any order.
    pub fn between(a: f64, b: f64) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }
    pub fn with_length(start: f64, length: f64) -> Self {
        Self::new(start, start + length.max(0.0))
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
    /// Half-open containment, `start <= pos < end`.
    pub fn contains(&self, pos: f64) -> bool {
        pos >= self.start && pos < self.end
    }
    pub fn contains_range(&self, other: &TimeRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }
    pub fn clip_value(&self, pos: f64) -> f64 {
        pos.max(self.start).min(self.end)
    }
    pub fn intersection(&self, other: &TimeRange) -> TimeRange {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        TimeRange {
            start,
            end: end.max(start),
        }
    }
    pub fn union(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
    pub fn expanded(&self, amount: f64) -> TimeRange {
        TimeRange::new(self.start - amount, self.end + amount)
    }
    pub fn shifted(&self, delta: f64) -> TimeRange {
        TimeRange {
            start: self.start + delta,
            end: self.end + delta,
        }
    }
    pub fn with_start(&self, start: f64) -> TimeRange {
        TimeRange::new(start, self.end.max(start))
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.3} - {:.3}]", self.start, self.end)
    }
}
