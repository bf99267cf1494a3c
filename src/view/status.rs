//! Play head position as text.

use crate::musical::MusicalContextAdapter;

pub const TICKS_PER_QUARTER: f64 = 960.0;

/// e.g. `00h:01m:05s.250ms`. Negative times get a leading minus.
pub fn format_timecode(seconds: f64) -> String {
    let millis = (seconds * 1000.0).round() as i64;
    let abs = millis.abs();
    let sign = if millis < 0 { "-" } else { "" };
    format!(
        "{sign}{:02}h:{:02}m:{:02}s.{:03}ms",
        abs / 3_600_000,
        (abs / 60_000) % 60,
        (abs / 1000) % 60,
        abs % 1000
    )
}

/// e.g. `bar 3 | beat 2 | tick 001`, counted from one. `None` without a tempo map.
pub fn format_musical_position(adapter: &MusicalContextAdapter, seconds: f64) -> Option<String> {
    let map = adapter.musical_map()?;
    let quarter = map.tempo.quarter_for_time(seconds);
    let bar = map.bars.bar_index_for_quarter(quarter);
    let beat_distance = map.bars.beat_distance_from_bar_start_for_quarter(quarter);
    let quarters_per_beat = 4.0 / map.bars.bar_signature_for_quarter(quarter).denominator as f64;
    let beat = beat_distance as i32;
    let tick = ((beat_distance - beat as f64) * quarters_per_beat * TICKS_PER_QUARTER).round() as i32;
    Some(format!(
        "bar {} | beat {} | tick {:03}",
        if bar >= 0 { bar + 1 } else { bar },
        beat + 1,
        tick + 1
    ))
}
