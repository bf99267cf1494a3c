//! Conversion between timeline base units and horizontal pixels.
//!
//! A mapper only has to be chronological: positions increase to the right.
//! The addressable domain (`timeline_range`) may be much larger than what is visible;
//! callers that need a valid pixel must check [`PixelMapper::is_pixel_position_within_bounds`].

use super::TimeRange;
use serde::{Deserialize, Serialize};

/// Highest zoom we allow, roughly two pixels per sample at 192kHz.
pub const MAX_PIXELS_PER_BASE_UNIT: f64 = 2.0 * 192000.0;
/// Widest pixel extent a timeline may take, with a safety margin for rounding.
pub const MAX_TIMELINE_WIDTH: f64 = (i32::MAX - 1) as f64;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct MapperState {
    zoom_factor: f64,
    scroll_start: f64,
    timeline_range: TimeRange,
}

impl Default for MapperState {
    fn default() -> Self {
        Self {
            zoom_factor: 1.0,
            scroll_start: 0.0,
            timeline_range: TimeRange::EMPTY,
        }
    }
}

pub(crate) fn round_to_pixel(v: f64) -> i32 {
    // `as` saturates, which keeps absurd zoom levels from wrapping around.
    v.round() as i32
}

pub fn is_valid_zoom_factor(factor: f64) -> bool {
    factor > 0.0 && factor.is_finite()
}

pub trait PixelMapper {
    /// Human readable unit name, e.g. "Seconds".
    fn base_unit_description(&self) -> &'static str;
    fn state(&self) -> &MapperState;
    fn state_mut(&mut self) -> &mut MapperState;

    /// Pixel closest to `position`, relative to the scroll start. Not bounds checked.
    fn pixel_for_position(&self, position: f64) -> i32;
    fn position_for_pixel(&self, pixel: i32) -> f64;

    /// Lets implementations refresh caches derived from the zoom factor.
    fn on_zoom_changed(&mut self) {}

    fn zoom_factor(&self) -> f64 {
        self.state().zoom_factor
    }

    /// `factor` must be positive and finite. Invalid factors trip a debug assertion
    /// and are ignored in release builds.
    fn set_zoom_factor(&mut self, factor: f64) {
        debug_assert!(
            is_valid_zoom_factor(factor),
            "zoom factor must be positive and finite, got {factor}"
        );
        if !is_valid_zoom_factor(factor) || self.state().zoom_factor == factor {
            return;
        }
        self.state_mut().zoom_factor = factor;
        self.on_zoom_changed();
    }

    fn scroll_start(&self) -> f64 {
        self.state().scroll_start
    }
    fn set_scroll_start(&mut self, position: f64) {
        self.state_mut().scroll_start = position;
    }

    fn timeline_range(&self) -> TimeRange {
        self.state().timeline_range
    }

    /// Replaces the addressable domain. The scroll start snaps to the new start when it
    /// falls outside the new range or when the previous range was empty.
    fn set_timeline_range(&mut self, range: TimeRange) {
        let state = self.state_mut();
        let previous = state.timeline_range;
        state.timeline_range = range;
        if !range.contains(state.scroll_start) || previous.length() == 0.0 {
            state.scroll_start = range.start;
        }
    }

    fn range_for_pixels(&self, start_x: i32, end_x: i32) -> TimeRange {
        TimeRange::between(
            self.position_for_pixel(start_x),
            self.position_for_pixel(end_x),
        )
    }

    /// Pixel of the timeline end, or 0 when it does not fit into `i32`.
    fn timeline_end_pixel(&self) -> i32 {
        let end = (self.timeline_range().end - self.scroll_start()) * self.zoom_factor();
        if end.round() >= i32::MIN as f64 && end.round() <= i32::MAX as f64 {
            self.pixel_for_position(self.timeline_range().end)
        } else {
            0
        }
    }

    /// Right-most pixel within both the timeline and the given bounds.
    fn end_pixel_for_bounds_within_timeline(&self, bounds_right: i32) -> i32 {
        let timeline_end = self.pixel_for_position(self.timeline_range().end);
        timeline_end.min(bounds_right)
    }

    fn is_pixel_position_within_bounds(&self, pixel: i32, inclusive_end: bool) -> bool {
        let position = self.position_for_pixel(pixel);
        let range = self.timeline_range();
        range.contains(position)
            || (inclusive_end && (position - range.end).abs() <= 0.5 / self.zoom_factor())
    }

    /// Pixel width of the whole timeline at the current zoom, clamped so that
    /// very long timelines at high zoom never overflow.
    fn timeline_width_pixels(&self) -> i32 {
        let length = self.timeline_range().length();
        let width = (length * self.zoom_factor())
            .min(length * MAX_PIXELS_PER_BASE_UNIT)
            .min(MAX_TIMELINE_WIDTH);
        width.floor() as i32
    }
}

/// Maps clock seconds to pixels.
#[derive(Clone, Debug)]
pub struct SecondsPixelMapper {
    state: MapperState,
    pixels_per_second: f64,
}

impl SecondsPixelMapper {
    pub fn new() -> Self {
        Self {
            state: MapperState::default(),
            pixels_per_second: 1.0,
        }
    }
    pub fn pixels_per_second(&self) -> f64 {
        self.pixels_per_second
    }
}

impl Default for SecondsPixelMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelMapper for SecondsPixelMapper {
    fn base_unit_description(&self) -> &'static str {
        "Seconds"
    }
    fn state(&self) -> &MapperState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut MapperState {
        &mut self.state
    }
    fn pixel_for_position(&self, position: f64) -> i32 {
        round_to_pixel((position - self.state.scroll_start) * self.pixels_per_second)
    }
    fn position_for_pixel(&self, pixel: i32) -> f64 {
        self.state.scroll_start + pixel as f64 / self.pixels_per_second
    }
    fn on_zoom_changed(&mut self) {
        self.pixels_per_second = self.state.zoom_factor;
    }
}

/// Maps musical quarter positions to pixels.
#[derive(Clone, Debug, Default)]
pub struct QuarterPixelMapper {
    state: MapperState,
}

impl QuarterPixelMapper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PixelMapper for QuarterPixelMapper {
    fn base_unit_description(&self) -> &'static str {
        "Quarters"
    }
    fn state(&self) -> &MapperState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut MapperState {
        &mut self.state
    }
    fn pixel_for_position(&self, position: f64) -> i32 {
        round_to_pixel((position - self.state.scroll_start) * self.state.zoom_factor)
    }
    fn position_for_pixel(&self, pixel: i32) -> f64 {
        self.state.scroll_start + pixel as f64 / self.state.zoom_factor
    }
}
