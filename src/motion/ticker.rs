//! Animation Ticker
//!
//! The central clock behind every entrance animation and overlay fade.
//!
//! # Overview
//!
//! Animations are scheduled with an owner, a tag, a scene property to drive
//! and a [`Motion`] that supplies the value. [`Ticker::advance`] moves the
//! clock, starts animations whose delay elapsed, writes their values into the
//! scene and reports what changed, so the caller can request a frame and
//! react to completions. Nothing runs on its own timer.

use std::time::Duration;

use slotmap::{SlotMap, new_key_type};

use super::tween::Motion;
use crate::device::DeviceId;
use crate::scene::{NodeHandle, Scene};

new_key_type! {
    /// Handle to a scheduled animation.
    pub struct AnimationKey;
}

/// Node property an animation writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimatedProperty {
    /// Local translation along Y.
    PositionY,
    /// Local rotation about X (other Euler components preserved).
    RotationX,
    /// Opacity of every material on the node's mesh.
    Opacity,
}

/// Where an animation's value lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationTarget {
    pub node: NodeHandle,
    pub property: AnimatedProperty,
}

impl AnimationTarget {
    #[must_use]
    pub fn new(node: NodeHandle, property: AnimatedProperty) -> Self {
        Self { node, property }
    }

    /// Writes `value` into the scene. Returns `false` if the node is gone.
    pub fn apply(&self, scene: &mut Scene, value: f32) -> bool {
        let Some(node) = scene.get_node_mut(self.node) else {
            return false;
        };
        match self.property {
            AnimatedProperty::PositionY => node.transform.position.y = value,
            AnimatedProperty::RotationX => {
                let euler = node.transform.rotation_euler();
                node.transform.set_rotation_euler(value, euler.y, euler.z);
            }
            AnimatedProperty::Opacity => node.set_opacity(value),
        }
        true
    }
}

/// Purpose of an animation, reported back on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationTag {
    Entrance,
    OverlayFade,
}

/// An animation began running (its delay elapsed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationStart {
    pub owner: DeviceId,
    pub tag: AnimationTag,
    /// Ticker time at which the delay elapsed.
    pub at: Duration,
}

/// An animation reached its final value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationDone {
    pub owner: DeviceId,
    pub tag: AnimationTag,
}

/// Result of one [`Ticker::advance`].
#[derive(Debug, Default, Clone)]
pub struct TickReport {
    /// Number of animations that wrote a value this tick.
    pub frames: usize,
    pub started: Vec<AnimationStart>,
    pub completed: Vec<AnimationDone>,
}

impl TickReport {
    /// `true` if any animation changed the scene.
    #[inline]
    #[must_use]
    pub fn changed(&self) -> bool {
        self.frames > 0 || !self.completed.is_empty()
    }
}

struct Animation {
    owner: DeviceId,
    tag: AnimationTag,
    target: AnimationTarget,
    motion: Motion,
    scheduled_at: Duration,
    delay: Duration,
    started: bool,
}

/// Drives scheduled animations from explicit time steps.
#[derive(Default)]
pub struct Ticker {
    animations: SlotMap<AnimationKey, Animation>,
    clock: Duration,
    frames_applied: u64,
}

impl Ticker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current ticker time.
    #[inline]
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock
    }

    /// Total animation frames written since creation.
    #[inline]
    #[must_use]
    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.animations.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// Schedules `motion` to drive `target` once `delay` has elapsed.
    pub fn schedule(
        &mut self,
        owner: DeviceId,
        tag: AnimationTag,
        target: AnimationTarget,
        motion: impl Into<Motion>,
        delay: Duration,
    ) -> AnimationKey {
        self.animations.insert(Animation {
            owner,
            tag,
            target,
            motion: motion.into(),
            scheduled_at: self.clock,
            delay,
            started: false,
        })
    }

    pub fn cancel(&mut self, key: AnimationKey) -> bool {
        self.animations.remove(key).is_some()
    }

    /// Drops every animation owned by `owner`. Returns how many were dropped.
    pub fn cancel_owner(&mut self, owner: DeviceId) -> usize {
        let before = self.animations.len();
        self.animations.retain(|_, anim| anim.owner != owner);
        before - self.animations.len()
    }

    /// `true` if `owner` has a pending or running animation tagged `tag`.
    #[must_use]
    pub fn has_animation(&self, owner: DeviceId, tag: AnimationTag) -> bool {
        self.animations
            .values()
            .any(|anim| anim.owner == owner && anim.tag == tag)
    }

    /// Advances the clock by `dt` and applies every running animation.
    pub fn advance(&mut self, dt: Duration, scene: &mut Scene) -> TickReport {
        self.clock += dt;
        let now = self.clock;
        let mut report = TickReport::default();
        let mut finished = Vec::new();

        for (key, anim) in &mut self.animations {
            let start_at = anim.scheduled_at.saturating_add(anim.delay);
            if now < start_at {
                continue;
            }

            let step = if anim.started {
                dt
            } else {
                anim.started = true;
                report.started.push(AnimationStart {
                    owner: anim.owner,
                    tag: anim.tag,
                    at: start_at,
                });
                now - start_at
            };

            let running = anim.motion.advance(step);
            if !anim.target.apply(scene, anim.motion.value()) {
                log::debug!("Animation target {:?} vanished; dropping", anim.target.node);
                finished.push((key, false));
                continue;
            }
            report.frames += 1;

            if !running {
                finished.push((key, true));
            }
        }

        for (key, completed) in finished {
            if let Some(anim) = self.animations.remove(key)
                && completed
            {
                report.completed.push(AnimationDone {
                    owner: anim.owner,
                    tag: anim.tag,
                });
            }
        }

        self.frames_applied += report.frames as u64;
        report
    }
}
