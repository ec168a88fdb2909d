//! Motion: springs, tweens and the animation ticker.

pub mod spring;
pub mod ticker;
pub mod tween;

pub use spring::{Axis, ListenerKey, PHYSICS_STEP, RotationSprings, Spring, SpringConfig, SpringEvent};
pub use ticker::{
    AnimatedProperty, AnimationDone, AnimationKey, AnimationStart, AnimationTag, AnimationTarget,
    TickReport, Ticker,
};
pub use tween::{Easing, Motion, Tween};
