//! The viewport owns a [`PixelMapper`] and is the single place where scroll position,
//! zoom factor and visible range change. Every mutation ends in an invalidation pass
//! which keeps zoom and scroll inside the timeline, then recomputes the visible range
//! and the vertical content offset.

use super::drag::{DragToScroll, DRAG_START_DISTANCE};
use super::{
    is_valid_zoom_factor, PixelMapper, TimeRange, MAX_PIXELS_PER_BASE_UNIT, MAX_TIMELINE_WIDTH,
};
use std::time::Instant;

/// Pixel step of one wheel "notch" before rescaling.
pub const SINGLE_STEP: i32 = 16;
/// A correction of scroll or zoom re-enters the layout once; the second pass must settle.
pub const MAX_LAYOUT_PASSES: usize = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Borders {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Borders {
    pub fn left_and_right(&self) -> i32 {
        self.left + self.right
    }
    pub fn top_and_bottom(&self) -> i32 {
        self.top + self.bottom
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
    pub command: bool,
}

/// Wheel movement in notches, positive is up/left.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WheelDelta {
    pub x: f32,
    pub y: f32,
}

/// Horizontal placement of a child, in pixels relative to the viewed content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelSpan {
    pub x: i32,
    pub width: i32,
}

impl PixelSpan {
    pub fn right(&self) -> i32 {
        self.x + self.width
    }
}

fn rescale_wheel_distance(distance: f32, single_step: i32) -> i32 {
    if distance == 0.0 {
        return 0;
    }
    let distance = distance * 14.0 * single_step as f32;
    let distance = if distance < 0.0 {
        distance.min(-1.0)
    } else {
        distance.max(1.0)
    };
    distance.round() as i32
}

pub struct TimelineViewport<M: PixelMapper> {
    mapper: M,
    borders: Borders,
    width: i32,
    height: i32,
    content_height: i32,
    content_y: i32,
    vertical_scroll: f64,
    components_range: TimeRange,
    allow_scroll_h: bool,
    allow_scroll_v: bool,
    drag: Option<DragToScroll>,
    visible_range_changed: bool,
    last_layout_passes: usize,
}

impl<M: PixelMapper> TimelineViewport<M> {
    pub fn new(mut mapper: M) -> Self {
        mapper.set_zoom_factor(1.0);
        let mut viewport = Self {
            mapper,
            borders: Borders::default(),
            width: 0,
            height: 0,
            content_height: 0,
            content_y: 0,
            vertical_scroll: 0.0,
            components_range: TimeRange::EMPTY,
            allow_scroll_h: true,
            allow_scroll_v: true,
            drag: None,
            visible_range_changed: false,
            last_layout_passes: 0,
        };
        viewport.invalidate();
        viewport
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }
    pub fn timeline_range(&self) -> TimeRange {
        self.mapper.timeline_range()
    }
    pub fn zoom_factor(&self) -> f64 {
        self.mapper.zoom_factor()
    }
    pub fn scroll_start(&self) -> f64 {
        self.mapper.scroll_start()
    }
    pub fn pixel_for_position(&self, position: f64) -> i32 {
        self.mapper.pixel_for_position(position)
    }
    pub fn position_for_pixel(&self, pixel: i32) -> f64 {
        self.mapper.position_for_pixel(pixel)
    }
    pub fn range_for_pixels(&self, start_x: i32, end_x: i32) -> TimeRange {
        self.mapper.range_for_pixels(start_x, end_x)
    }

    /// What is currently shown. Zoom and scroll are kept so that this lies within the
    /// timeline range.
    pub fn visible_range(&self) -> TimeRange {
        self.components_range
    }

    /// Returns the visible range once after it changed, then `None` until the next change.
    pub fn take_visible_range_change(&mut self) -> Option<TimeRange> {
        if std::mem::take(&mut self.visible_range_changed) {
            Some(self.visible_range())
        } else {
            None
        }
    }

    pub fn last_layout_passes(&self) -> usize {
        self.last_layout_passes
    }

    // sizes

    pub fn set_size(&mut self, width: i32, height: i32) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width.max(0);
        self.height = height.max(0);
        self.invalidate();
    }
    pub fn width(&self) -> i32 {
        self.width
    }
    pub fn height(&self) -> i32 {
        self.height
    }
    pub fn viewed_component_borders(&self) -> Borders {
        self.borders
    }
    pub fn set_viewed_component_borders(&mut self, borders: Borders) {
        if self.borders == borders {
            return;
        }
        self.borders = borders;
        self.invalidate();
    }
    pub fn width_excluding_borders(&self) -> i32 {
        (self.width - self.borders.left_and_right()).max(0)
    }
    pub fn height_excluding_borders(&self) -> i32 {
        (self.height - self.borders.top_and_bottom()).max(0)
    }

    /// Height of the scrolled content. Never less than the visible height.
    pub fn content_height(&self) -> i32 {
        self.content_height.max(self.height_excluding_borders())
    }
    pub fn set_content_height(&mut self, height: i32) {
        if self.content_height == height {
            return;
        }
        self.content_height = height.max(0);
        self.invalidate();
    }
    /// Top of the content relative to the clipped area, i.e. minus the vertical scroll.
    pub fn content_y(&self) -> i32 {
        self.content_y
    }
    pub fn vertical_scroll(&self) -> f64 {
        self.vertical_scroll
    }

    // timeline and range

    /// Replaces the addressable domain. Empty ranges are ignored.
    pub fn set_timeline_range(&mut self, range: TimeRange) {
        let previous = self.mapper.timeline_range();
        if range.is_empty() || previous == range {
            return;
        }
        log::debug!("timeline range {previous} -> {range}");
        self.mapper.set_timeline_range(range);
        self.invalidate();
    }

    /// Shows `range` across `constrain_width` pixels (the whole width when `None`).
    ///
    /// `range` must lie within the timeline range and the width must be positive and not
    /// wider than the viewport. In release builds an out-of-range request is clipped and a
    /// degenerate one is ignored.
    pub fn set_visible_range(&mut self, range: TimeRange, constrain_width: Option<i32>) {
        let timeline = self.timeline_range();
        debug_assert!(
            timeline.contains_range(&range),
            "visible range {range} must be within timeline range {timeline}"
        );
        let width = match constrain_width {
            Some(width) => {
                debug_assert!(
                    width > 0 && width <= self.width_excluding_borders(),
                    "constrain width {width} outside of viewport"
                );
                width
            }
            None => self.width_excluding_borders(),
        };
        debug_assert!(width > 0, "viewport has no size yet");

        let clipped = TimeRange::new(
            timeline.clip_value(range.start),
            timeline.clip_value(range.end),
        );
        if width <= 0 || clipped.is_empty() {
            return;
        }
        self.mapper.set_scroll_start(clipped.start);
        self.mapper.set_zoom_factor(width as f64 / clipped.length());
        self.invalidate_with(Some(clipped));
    }

    pub fn set_visible_range_with_ratio(&mut self, start: f64, pixel_ratio: f64) {
        self.mapper.set_zoom_factor(self.clamp_zoom_factor(pixel_ratio));
        self.mapper.set_scroll_start(self.clip_scroll_start(start));
        self.invalidate();
    }

    /// Factors showing more than the timeline are raised until it fills the width.
    pub fn set_zoom_factor(&mut self, factor: f64) {
        self.mapper.set_zoom_factor(self.clamp_zoom_factor(factor));
        self.invalidate();
    }

    /// Zooms so that `anchor` stays at the same pixel.
    pub fn set_zoom_factor_around_position(&mut self, factor: f64, anchor: f64) {
        let factor = self.clamp_zoom_factor(factor);
        let start = anchor - self.mapper.pixel_for_position(anchor) as f64 / factor;
        self.set_visible_range_with_ratio(start, factor);
    }

    /// Like [`Self::constrain_zoom_factor`] without rounding the timeline to whole pixels.
    /// Invalid factors and an unsized viewport pass through unchanged.
    fn clamp_zoom_factor(&self, factor: f64) -> f64 {
        let length = self.timeline_range().length();
        let width = self.width_excluding_borders() as f64;
        if length <= 0.0 || width <= 0.0 || !is_valid_zoom_factor(factor) {
            return factor;
        }
        let min = width.min(MAX_TIMELINE_WIDTH) / length;
        let max = MAX_PIXELS_PER_BASE_UNIT.min(MAX_TIMELINE_WIDTH / length).max(min);
        factor.clamp(min, max)
    }

    /// Pulls zoom and scroll start back into the timeline after sizes or ranges changed.
    /// Returns true when anything moved.
    fn fit_to_timeline(&mut self) -> bool {
        let mut corrected = false;
        let zoom = self.clamp_zoom_factor(self.zoom_factor());
        if zoom != self.zoom_factor() {
            self.mapper.set_zoom_factor(zoom);
            corrected = true;
        }
        if self.width_excluding_borders() > 0 && !self.timeline_range().is_empty() {
            let start = self.clip_scroll_start(self.scroll_start());
            if start != self.scroll_start() {
                self.mapper.set_scroll_start(start);
                corrected = true;
            }
        }
        corrected
    }

    /// Limits `factor` so the timeline neither overflows the pixel range nor gets narrower
    /// than the viewport.
    pub fn constrain_zoom_factor(&self, factor: f64) -> f64 {
        let length = self.timeline_range().length();
        if length <= 0.0 {
            return factor.min(MAX_PIXELS_PER_BASE_UNIT);
        }
        let width = (length * factor)
            .min(length * MAX_PIXELS_PER_BASE_UNIT)
            .min(MAX_TIMELINE_WIDTH)
            .floor();
        let min_width = (self.width_excluding_borders() as f64).min(MAX_TIMELINE_WIDTH);
        width.max(min_width) / length
    }

    /// Clips a scroll start so the visible end stays inside the timeline where possible.
    pub fn clip_scroll_start(&self, start: f64) -> f64 {
        let timeline = self.timeline_range();
        let visible_length = self.width_excluding_borders() as f64 / self.zoom_factor();
        let max_start = (timeline.end - visible_length).max(timeline.start);
        start.max(timeline.start).min(max_start)
    }

    pub fn scroll_to(&mut self, start: f64) {
        let start = self.clip_scroll_start(start);
        if start != self.mapper.scroll_start() {
            self.mapper.set_scroll_start(start);
            self.invalidate();
        }
    }

    fn clip_vertical_scroll(&self, y: f64) -> f64 {
        let max = (self.content_height() - self.height_excluding_borders()).max(0) as f64;
        y.max(0.0).min(max)
    }

    pub fn set_vertical_scroll(&mut self, y: f64) {
        let y = self.clip_vertical_scroll(y);
        if y != self.vertical_scroll {
            self.vertical_scroll = y;
            self.invalidate();
        }
    }

    /// A scroll bar was dragged to `new_start` (base units for horizontal, pixels for vertical).
    pub fn scroll_bar_moved(&mut self, axis: Axis, new_start: f64) {
        match axis {
            Axis::Horizontal => {
                if new_start == self.visible_range().start {
                    return;
                }
                // changes position only, the visible length stays.
                self.mapper.set_scroll_start(self.clip_scroll_start(new_start));
            }
            Axis::Vertical => self.vertical_scroll = self.clip_vertical_scroll(new_start),
        }
        self.invalidate();
    }

    // input

    pub fn set_is_scroll_wheel_allowed(&mut self, horizontal: bool, vertical: bool) {
        self.allow_scroll_h = horizontal;
        self.allow_scroll_v = vertical;
    }

    /// Returns true when the wheel event was consumed.
    pub fn mouse_wheel_move(&mut self, wheel: WheelDelta, mods: Modifiers) -> bool {
        if mods.alt || mods.ctrl || mods.command {
            return false;
        }
        if !(self.allow_scroll_h || self.allow_scroll_v) {
            return false;
        }
        let delta_x = rescale_wheel_distance(wheel.x, SINGLE_STEP) as f64;
        let delta_y = rescale_wheel_distance(wheel.y, SINGLE_STEP) as f64;
        let factor = self.zoom_factor();

        let mut new_start = self.scroll_start();
        let mut new_y = self.vertical_scroll;

        if delta_x != 0.0 && delta_y != 0.0 && self.allow_scroll_h && self.allow_scroll_v {
            new_start -= delta_x / factor;
            new_y -= delta_y;
        } else if self.allow_scroll_h && (delta_x != 0.0 || mods.shift || !self.allow_scroll_v) {
            let delta = if delta_x != 0.0 { delta_x } else { delta_y };
            new_start -= delta / factor;
        } else if self.allow_scroll_v && delta_y != 0.0 {
            new_y -= delta_y;
        }

        let mut did_update = false;
        let new_y = self.clip_vertical_scroll(new_y);
        if new_y != self.vertical_scroll {
            self.vertical_scroll = new_y;
            did_update = true;
        }
        if !self.visible_range().contains_range(&self.timeline_range()) {
            let new_start = self.clip_scroll_start(new_start);
            if new_start != self.scroll_start() {
                self.mapper.set_scroll_start(new_start);
                did_update = true;
            }
        }
        if did_update {
            self.invalidate();
        }
        did_update
    }

    /// Pinch zoom around the pointer, `x` in viewport coordinates.
    pub fn mouse_magnify(&mut self, x: i32, scale: f64) {
        let anchor = self
            .mapper
            .position_for_pixel(x - self.borders.left);
        self.set_zoom_factor_around_position(scale * self.zoom_factor(), anchor);
    }

    /// Scrolls towards the edge the pointer is close to, for dragging content past the border.
    /// Coordinates are relative to the area inside the borders. Returns true when it moved.
    pub fn auto_scroll(
        &mut self,
        mouse_x: i32,
        mouse_y: i32,
        border_thickness: i32,
        maximum_speed: i32,
    ) -> bool {
        let clip_width = self.width_excluding_borders();
        let clip_height = self.height_excluding_borders();
        let mut dx = 0;
        let mut dy = 0;
        if self.allow_scroll_h {
            if mouse_x < border_thickness {
                dx = border_thickness - mouse_x;
            } else if mouse_x >= clip_width - border_thickness {
                dx = (clip_width - border_thickness) - mouse_x;
            }
            dx = dx.clamp(-maximum_speed, maximum_speed);
        }
        if self.allow_scroll_v {
            if mouse_y < border_thickness {
                dy = border_thickness - mouse_y;
            } else if mouse_y >= clip_height - border_thickness {
                dy = (clip_height - border_thickness) - mouse_y;
            }
            dy = dy.clamp(-maximum_speed, maximum_speed);
        }
        if dx == 0 && dy == 0 {
            return false;
        }
        // dx is pixels, the scroll start is in base units
        let new_start = self.clip_scroll_start(self.scroll_start() - dx as f64 / self.zoom_factor());
        let new_y = self.clip_vertical_scroll(self.vertical_scroll - dy as f64);
        if new_start == self.scroll_start() && new_y == self.vertical_scroll {
            return false;
        }
        self.mapper.set_scroll_start(new_start);
        self.vertical_scroll = new_y;
        self.invalidate();
        true
    }

    pub fn set_scroll_on_drag_enabled(&mut self, enabled: bool) {
        if self.is_scroll_on_drag_enabled() != enabled {
            self.drag = enabled.then(DragToScroll::default);
        }
    }
    pub fn is_scroll_on_drag_enabled(&self) -> bool {
        self.drag.is_some()
    }
    pub fn is_currently_scrolling_on_drag(&self) -> bool {
        self.drag.as_ref().is_some_and(|d| d.is_dragging())
    }

    pub fn mouse_down(&mut self) {
        if let Some(drag) = self.drag.as_mut() {
            if !drag.is_pressed {
                // stop any momentum left from the last gesture
                let (x, y) = (drag.offset_x.position(), drag.offset_y.position());
                drag.offset_x.set_position(x);
                drag.offset_y.set_position(y);
                drag.is_pressed = true;
            }
        }
    }

    /// `offset` is the pointer travel since the press. Returns true once the gesture scrolls.
    pub fn mouse_drag(&mut self, offset: (f32, f32), now: Instant) -> bool {
        let scroll_start = self.scroll_start();
        let vertical_scroll = self.vertical_scroll;
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        let distance = (offset.0 * offset.0 + offset.1 * offset.1).sqrt();
        if !drag.is_dragging && distance > DRAG_START_DISTANCE {
            drag.is_dragging = true;
            drag.original_scroll_start = scroll_start;
            drag.original_vertical_scroll = vertical_scroll;
            drag.offset_x.set_position(0.0);
            drag.offset_x.begin_drag();
            drag.offset_y.set_position(0.0);
            drag.offset_y.begin_drag();
        }
        if !drag.is_dragging {
            return false;
        }
        drag.offset_x.drag(offset.0 as f64, now);
        drag.offset_y.drag(offset.1 as f64, now);
        self.apply_drag_offsets();
        true
    }

    pub fn mouse_up(&mut self, now: Instant) {
        if let Some(drag) = self.drag.as_mut() {
            if drag.is_dragging {
                drag.offset_x.end_drag(now);
                drag.offset_y.end_drag(now);
            }
            drag.is_dragging = false;
            drag.is_pressed = false;
        }
    }

    /// Advances drag momentum, to be called once per frame. Returns true while moving.
    pub fn update_drag_momentum(&mut self, now: Instant) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        let moved_x = drag.offset_x.update(now);
        let moved_y = drag.offset_y.update(now);
        if moved_x || moved_y {
            self.apply_drag_offsets();
        }
        moved_x || moved_y
    }

    fn apply_drag_offsets(&mut self) {
        let Some(drag) = self.drag.as_ref() else {
            return;
        };
        // offsets are pixels: convert through the zoom factor
        let start = drag.original_scroll_start - drag.offset_x.position() / self.zoom_factor();
        let y = drag.original_vertical_scroll - drag.offset_y.position();
        self.mapper.set_scroll_start(self.clip_scroll_start(start));
        self.vertical_scroll = self.clip_vertical_scroll(y);
        self.invalidate();
    }

    // layout

    /// Places a child of fixed pixel width at the start (or end) of `entire_range`, clipped
    /// by `visible_range`. Returns `None` when nothing of it is visible.
    pub fn anchor_child_for_time_range(
        &self,
        entire_range: TimeRange,
        visible_range: TimeRange,
        parent_width: i32,
        absolute_width: f32,
        anchor_to_end: bool,
    ) -> Option<PixelSpan> {
        debug_assert!(entire_range.contains_range(&visible_range));
        let relative_width = absolute_width as f64 / self.zoom_factor();
        let child_range = if anchor_to_end {
            entire_range.with_start(entire_range.end - relative_width)
        } else {
            TimeRange::with_length(entire_range.start, relative_width)
        };
        let visible_child = visible_range.intersection(&child_range);
        if visible_child.is_empty() {
            return None;
        }
        let start = self.mapper.pixel_for_position(visible_child.start);
        let end = self.mapper.pixel_for_position(visible_child.end);
        if anchor_to_end {
            let width = end - start;
            // rounding can collapse it
            if width <= 0 {
                return None;
            }
            Some(PixelSpan {
                x: parent_width - width,
                width,
            })
        } else {
            let x = (absolute_width - end as f32).max(0.0) as i32;
            Some(PixelSpan {
                x: -x,
                width: absolute_width.round() as i32,
            })
        }
    }

    pub fn invalidate(&mut self) {
        self.invalidate_with(None);
    }

    /// Lays out the content for the current scroll and zoom, then corrects scroll and zoom
    /// against the timeline. A correction invalidates what the pass computed, so the layout
    /// runs again until a pass changes nothing, at most [`MAX_LAYOUT_PASSES`] times.
    /// An explicit range is shown as requested and never corrected.
    fn invalidate_with(&mut self, explicit_range: Option<TimeRange>) {
        let previous = self.components_range;
        let mut settled = false;
        for pass in 1..=MAX_LAYOUT_PASSES {
            self.last_layout_passes = pass;
            self.components_range = explicit_range
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| {
                    TimeRange::between(
                        self.mapper.scroll_start(),
                        self.mapper
                            .position_for_pixel(self.width_excluding_borders()),
                    )
                });
            self.vertical_scroll = self.clip_vertical_scroll(self.vertical_scroll);
            self.content_y = -(self.vertical_scroll.round() as i32);

            if explicit_range.is_some() || !self.fit_to_timeline() {
                settled = true;
                break;
            }
        }
        if !settled {
            log::trace!("viewport layout did not settle in {MAX_LAYOUT_PASSES} passes");
        }
        if self.components_range != previous {
            self.visible_range_changed = true;
        }
    }

    /// Multi-line state dump for debugging overlays.
    pub fn describe(&self) -> String {
        let timeline = self.timeline_range();
        let end_pixel = self
            .mapper
            .end_pixel_for_bounds_within_timeline(self.width_excluding_borders());
        let right_most = if end_pixel == self.mapper.timeline_end_pixel() {
            timeline.end
        } else if self
            .mapper
            .is_pixel_position_within_bounds(self.width_excluding_borders(), true)
        {
            self.mapper.position_for_pixel(self.width_excluding_borders())
        } else {
            -1.0
        };
        format!(
            "Timeline Length:\n{} - {}\nVisible Length: {} - {}\nZoom: 1px:{}{}\nLeftPos(t): {} RightPos(t): {} Width(px) excl border: {} Height: {}\nExpected End Pixel (if valid): {}",
            timeline.start,
            timeline.end,
            self.components_range.start,
            self.components_range.end,
            self.zoom_factor(),
            self.mapper.base_unit_description(),
            self.scroll_start(),
            right_most,
            self.width_excluding_borders(),
            self.height,
            end_pixel
        )
    }
}
