//! Horizontal time axis: ranges, pixel mapping and the scrolling viewport.

pub mod drag;
pub mod pixel_mapper;
pub mod range;
pub mod viewport;

pub use pixel_mapper::{
    is_valid_zoom_factor, MapperState, PixelMapper, QuarterPixelMapper, SecondsPixelMapper,
    MAX_PIXELS_PER_BASE_UNIT, MAX_TIMELINE_WIDTH,
};
pub use range::TimeRange;
pub use viewport::{Axis, Borders, Modifiers, PixelSpan, TimelineViewport, WheelDelta};
