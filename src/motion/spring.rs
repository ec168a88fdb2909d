//! Damped Spring Motion
//!
//! A scalar second-order spring integrated at a fixed physical step, plus the
//! pitch/yaw pair that turns pointer samples into smoothed model rotation.
//!
//! # Overview
//!
//! - [`Spring`]: one damped oscillator (`value`, `velocity`, `target`).
//! - [`RotationSprings`]: the two rotation axes and their change listeners.
//!
//! Integration runs in whole steps of [`PHYSICS_STEP`] seconds taken from an
//! accumulator, so the trajectory is identical regardless of frame rate.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

/// Fixed integration step, in seconds.
pub const PHYSICS_STEP: f32 = 1.0 / 120.0;

// ============================================================================
// Configuration
// ============================================================================

/// Physical parameters of a [`Spring`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
    /// Speed below which the spring may come to rest.
    pub rest_speed: f32,
    /// Distance from target below which the spring may come to rest.
    pub rest_delta: f32,
}

impl SpringConfig {
    /// Pointer-driven model rotation.
    pub const ROTATION: Self = Self {
        stiffness: 40.0,
        damping: 20.0,
        mass: 1.4,
        rest_speed: 0.001,
        rest_delta: 0.005,
    };

    /// Vertical rise of a `spring-up` entrance.
    pub const SPRING_UP: Self = Self {
        stiffness: 60.0,
        damping: 20.0,
        mass: 1.0,
        rest_speed: 0.0001,
        rest_delta: 0.0001,
    };

    /// Hinge swing of a `hinge-open` entrance.
    pub const HINGE_OPEN: Self = Self {
        stiffness: 80.0,
        damping: 20.0,
        mass: 1.0,
        rest_speed: 0.0001,
        rest_delta: 0.0001,
    };
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::ROTATION
    }
}

// ============================================================================
// Spring
// ============================================================================

/// A damped scalar oscillator chasing a target value.
#[derive(Debug, Clone)]
pub struct Spring {
    config: SpringConfig,
    value: f32,
    velocity: f32,
    target: f32,
    accumulator: f32,
    at_rest: bool,
}

impl Spring {
    /// Creates a spring resting at `initial`.
    #[must_use]
    pub fn new(initial: f32, config: SpringConfig) -> Self {
        Self {
            config,
            value: initial,
            velocity: 0.0,
            target: initial,
            accumulator: 0.0,
            at_rest: true,
        }
    }

    /// Creates a spring at `from` already heading for `to`.
    #[must_use]
    pub fn toward(from: f32, to: f32, config: SpringConfig) -> Self {
        let mut spring = Self::new(from, config);
        spring.set_target(to);
        spring
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    #[must_use]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SpringConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    /// Retargets the spring. Returns `true` if this woke a resting spring.
    pub fn set_target(&mut self, target: f32) -> bool {
        self.target = target;
        let was_resting = self.at_rest;
        self.at_rest = self.velocity == 0.0 && self.value == target;
        was_resting && !self.at_rest
    }

    /// Moves the spring to `value` and stops it there.
    pub fn jump(&mut self, value: f32) {
        self.value = value;
        self.target = value;
        self.velocity = 0.0;
        self.accumulator = 0.0;
        self.at_rest = true;
    }

    /// Advances by exactly one physical step.
    ///
    /// Returns `true` while the spring is still moving afterwards.
    pub fn step(&mut self) -> bool {
        if self.at_rest {
            return false;
        }

        let SpringConfig {
            stiffness,
            damping,
            mass,
            rest_speed,
            rest_delta,
        } = self.config;

        let spring_force = -stiffness * (self.value - self.target);
        let damping_force = -damping * self.velocity;
        let acceleration = (spring_force + damping_force) / mass;

        // Semi-implicit Euler: velocity first, then position.
        self.velocity += acceleration * PHYSICS_STEP;
        self.value += self.velocity * PHYSICS_STEP;

        if self.velocity.abs() < rest_speed && (self.value - self.target).abs() < rest_delta {
            self.value = self.target;
            self.velocity = 0.0;
            self.at_rest = true;
        }

        !self.at_rest
    }

    /// Advances by as many whole physical steps as `dt` covers.
    ///
    /// Leftover time is carried into the next call. Returns `true` while the
    /// spring is still moving.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if self.at_rest {
            self.accumulator = 0.0;
            return false;
        }
        self.accumulator += dt.as_secs_f32();
        while self.accumulator >= PHYSICS_STEP {
            self.accumulator -= PHYSICS_STEP;
            if !self.step() {
                self.accumulator = 0.0;
                break;
            }
        }
        !self.at_rest
    }
}

// ============================================================================
// Rotation springs
// ============================================================================

/// The two rotation axes driven by pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Rotation about X, fed by vertical pointer offset.
    Pitch,
    /// Rotation about Y, fed by horizontal pointer offset.
    Yaw,
}

/// What a change listener is told.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringEvent {
    pub axis: Axis,
    pub value: f32,
    /// `true` while the axis is in motion.
    pub moving: bool,
}

new_key_type! {
    /// Handle returned by [`RotationSprings::on_change`].
    pub struct ListenerKey;
}

type ChangeListener = Box<dyn FnMut(&SpringEvent) + Send>;

/// Pitch and yaw springs with change notification.
pub struct RotationSprings {
    pitch: Spring,
    yaw: Spring,
    listeners: SlotMap<ListenerKey, ChangeListener>,
    accumulator: f32,
}

impl Default for RotationSprings {
    fn default() -> Self {
        Self::new(SpringConfig::ROTATION)
    }
}

impl std::fmt::Debug for RotationSprings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationSprings")
            .field("pitch", &self.pitch)
            .field("yaw", &self.yaw)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl RotationSprings {
    #[must_use]
    pub fn new(config: SpringConfig) -> Self {
        Self {
            pitch: Spring::new(0.0, config),
            yaw: Spring::new(0.0, config),
            listeners: SlotMap::with_key(),
            accumulator: 0.0,
        }
    }

    #[inline]
    #[must_use]
    pub fn spring(&self, axis: Axis) -> &Spring {
        match axis {
            Axis::Pitch => &self.pitch,
            Axis::Yaw => &self.yaw,
        }
    }

    #[inline]
    fn spring_mut(&mut self, axis: Axis) -> &mut Spring {
        match axis {
            Axis::Pitch => &mut self.pitch,
            Axis::Yaw => &mut self.yaw,
        }
    }

    /// Current value of `axis`.
    #[inline]
    #[must_use]
    pub fn value(&self, axis: Axis) -> f32 {
        self.spring(axis).value()
    }

    /// Returns `true` while either axis is moving.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        !self.pitch.is_at_rest() || !self.yaw.is_at_rest()
    }

    /// Updates the target for `axis`, notifying listeners if the axis wakes.
    pub fn set_target(&mut self, axis: Axis, target: f32) {
        if self.spring_mut(axis).set_target(target) {
            let value = self.value(axis);
            self.notify(&SpringEvent {
                axis,
                value,
                moving: true,
            });
        }
    }

    /// Advances both springs by one physical step.
    ///
    /// Returns `true` if either is still in motion.
    pub fn tick(&mut self) -> bool {
        let pitch = self.step_axis(Axis::Pitch);
        let yaw = self.step_axis(Axis::Yaw);
        pitch || yaw
    }

    /// Runs as many physical steps as `dt` covers.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.is_moving() {
            self.accumulator = 0.0;
            return false;
        }
        self.accumulator += dt.as_secs_f32();
        while self.accumulator >= PHYSICS_STEP {
            self.accumulator -= PHYSICS_STEP;
            if !self.tick() {
                self.accumulator = 0.0;
                break;
            }
        }
        self.is_moving()
    }

    fn step_axis(&mut self, axis: Axis) -> bool {
        let spring = self.spring_mut(axis);
        if spring.is_at_rest() {
            return false;
        }
        let before = spring.value();
        let moving = spring.step();
        let value = spring.value();
        if value != before || !moving {
            self.notify(&SpringEvent {
                axis,
                value,
                moving,
            });
        }
        moving
    }

    fn notify(&mut self, event: &SpringEvent) {
        for listener in self.listeners.values_mut() {
            listener(event);
        }
    }

    /// Registers a change listener.
    pub fn on_change(&mut self, listener: impl FnMut(&SpringEvent) + Send + 'static) -> ListenerKey {
        self.listeners.insert(Box::new(listener))
    }

    /// Removes one listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        self.listeners.remove(key).is_some()
    }

    /// Removes every listener.
    pub fn unsubscribe_all(&mut self) {
        self.listeners.clear();
    }

    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
