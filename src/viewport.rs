//! Viewport Controller
//!
//! Gates pointer rotation on visibility and the reduced-motion preference,
//! tracks the container size, and turns throttled pointer samples into
//! spring targets.

use std::time::{Duration, Instant};

use glam::Vec2;

use crate::motion::{Axis, RotationSprings};
use crate::utils::Throttle;

/// Minimum spacing between accepted pointer samples.
pub const POINTER_THROTTLE: Duration = Duration::from_millis(100);
/// Visible fraction of the container needed to track the pointer.
pub const VISIBILITY_THRESHOLD: f32 = 0.2;
/// Scale from normalised pointer offset to rotation target (radians).
pub const POINTER_SENSITIVITY: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct ViewportController {
    width: u32,
    height: u32,
    visible: bool,
    reduced_motion: bool,
    throttle: Throttle,
}

impl ViewportController {
    #[must_use]
    pub fn new(width: u32, height: u32, reduced_motion: bool) -> Self {
        Self {
            width,
            height,
            visible: true,
            reduced_motion,
            throttle: Throttle::new(POINTER_THROTTLE),
        }
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    #[must_use]
    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    /// Pointer samples are only consumed while visible and motion is allowed.
    #[inline]
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.visible && !self.reduced_motion
    }

    /// Records the container's visible fraction. Returns `true` if the
    /// visibility state flipped.
    pub fn set_visibility_ratio(&mut self, ratio: f32) -> bool {
        let visible = ratio > 0.0 && ratio >= VISIBILITY_THRESHOLD;
        let changed = visible != self.visible;
        self.visible = visible;
        if changed {
            log::debug!("Viewport visibility -> {visible} (ratio {ratio:.2})");
        }
        changed
    }

    pub fn set_reduced_motion(&mut self, reduced_motion: bool) {
        self.reduced_motion = reduced_motion;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Pointer position relative to the container centre, in `[-0.5, 0.5]`.
    #[must_use]
    pub fn normalized_offset(&self, x: f32, y: f32) -> Vec2 {
        let w = self.width.max(1) as f32;
        let h = self.height.max(1) as f32;
        let offset = Vec2::new((x - w * 0.5) / w, (y - h * 0.5) / h);
        offset.clamp(Vec2::splat(-0.5), Vec2::splat(0.5))
    }

    /// Feeds a pointer sample at `now` into `springs`.
    ///
    /// Vertical offset drives pitch, horizontal drives yaw. Returns `true` if
    /// the sample was accepted.
    pub fn pointer_moved(&mut self, x: f32, y: f32, now: Instant, springs: &mut RotationSprings) -> bool {
        if !self.is_tracking() || !self.throttle.ready(now) {
            return false;
        }
        let offset = self.normalized_offset(x, y) * POINTER_SENSITIVITY;
        springs.set_target(Axis::Pitch, offset.y);
        springs.set_target(Axis::Yaw, offset.x);
        true
    }
}
