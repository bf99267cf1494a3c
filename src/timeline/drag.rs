//! Drag-to-scroll with momentum.
//!
//! A dragged position follows the pointer; when released it keeps moving with the
//! release velocity, decaying every update until it falls under a minimum velocity.

use std::time::Instant;

/// Pointer travel (in pixels) before a press turns into a drag-scroll.
pub const DRAG_START_DISTANCE: f32 = 8.0;
/// Velocity (pixels per second) under which momentum stops.
pub const DRAG_MINIMUM_VELOCITY: f64 = 60.0;

const MINIMUM_ELAPSED_SECONDS: f64 = 0.005;

#[derive(Clone, Debug)]
pub struct MomentumBehaviour {
    velocity: f64,
    damping: f64,
    minimum_velocity: f64,
}

impl Default for MomentumBehaviour {
    fn default() -> Self {
        Self {
            velocity: 0.0,
            damping: 0.92,
            minimum_velocity: 0.05,
        }
    }
}

impl MomentumBehaviour {
    pub fn set_friction(&mut self, friction: f64) {
        self.damping = 1.0 - friction;
    }
    pub fn set_minimum_velocity(&mut self, velocity: f64) {
        self.minimum_velocity = velocity;
    }
    pub fn released_with_velocity(&mut self, velocity: f64) {
        self.velocity = velocity;
    }
    pub fn next_position(&mut self, old_position: f64, elapsed_seconds: f64) -> f64 {
        self.velocity *= self.damping;
        if self.velocity.abs() < self.minimum_velocity {
            self.velocity = 0.0;
        }
        old_position + self.velocity * elapsed_seconds
    }
    pub fn is_stopped(&self) -> bool {
        self.velocity == 0.0
    }
}

/// One axis of a drag gesture.
#[derive(Clone, Debug, Default)]
pub struct AnimatedPosition {
    position: f64,
    grabbed_position: f64,
    release_velocity: f64,
    last_drag: Option<Instant>,
    last_update: Option<Instant>,
    animating: bool,
    pub behaviour: MomentumBehaviour,
}

impl AnimatedPosition {
    pub fn position(&self) -> f64 {
        self.position
    }
    /// Jumps to `position` and stops any running momentum.
    pub fn set_position(&mut self, position: f64) {
        self.position = position;
        self.animating = false;
    }
    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn begin_drag(&mut self) {
        self.grabbed_position = self.position;
        self.release_velocity = 0.0;
        self.last_drag = None;
        self.animating = false;
    }

    pub fn drag(&mut self, delta_from_start_of_drag: f64, now: Instant) {
        let new_position = self.grabbed_position + delta_from_start_of_drag;
        self.record_velocity(new_position, now);
        self.position = new_position;
    }

    pub fn end_drag(&mut self, now: Instant) {
        self.behaviour.released_with_velocity(self.release_velocity);
        self.animating = !self.behaviour.is_stopped();
        self.last_update = Some(now);
    }

    /// Advances the momentum animation. Returns true when the position moved.
    pub fn update(&mut self, now: Instant) -> bool {
        if !self.animating {
            return false;
        }
        let elapsed = self
            .last_update
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f64());
        self.last_update = Some(now);
        let new_position = self.behaviour.next_position(self.position, elapsed);
        self.animating = !self.behaviour.is_stopped();
        let moved = new_position != self.position;
        self.position = new_position;
        moved
    }

    fn record_velocity(&mut self, new_position: f64, now: Instant) {
        if let Some(last) = self.last_drag {
            let elapsed = now
                .saturating_duration_since(last)
                .as_secs_f64()
                .max(MINIMUM_ELAPSED_SECONDS);
            let velocity = (new_position - self.position) / elapsed;
            self.release_velocity = velocity * 0.8 + self.release_velocity * 0.2;
        }
        self.last_drag = Some(now);
    }
}

/// State of a drag-to-scroll gesture over the viewport.
#[derive(Clone, Debug)]
pub struct DragToScroll {
    pub(super) offset_x: AnimatedPosition,
    pub(super) offset_y: AnimatedPosition,
    pub(super) original_scroll_start: f64,
    pub(super) original_vertical_scroll: f64,
    pub(super) is_dragging: bool,
    pub(super) is_pressed: bool,
}

impl Default for DragToScroll {
    fn default() -> Self {
        let mut offset_x = AnimatedPosition::default();
        let mut offset_y = AnimatedPosition::default();
        offset_x
            .behaviour
            .set_minimum_velocity(DRAG_MINIMUM_VELOCITY);
        offset_y
            .behaviour
            .set_minimum_velocity(DRAG_MINIMUM_VELOCITY);
        Self {
            offset_x,
            offset_y,
            original_scroll_start: 0.0,
            original_vertical_scroll: 0.0,
            is_dragging: false,
            is_pressed: false,
        }
    }
}

impl DragToScroll {
    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }
    pub fn is_animating(&self) -> bool {
        self.offset_x.is_animating() || self.offset_y.is_animating()
    }
}
