//! Time-based scalar tweens.

use std::time::Duration;

use super::spring::Spring;

/// Easing curve applied to normalised progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    /// Decelerating quadratic.
    #[default]
    EaseOut,
    EaseInOut,
}

impl Easing {
    /// Maps `t` in `[0, 1]` onto the curve.
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Interpolates `from → to` over a fixed duration.
#[derive(Debug, Clone)]
pub struct Tween {
    from: f32,
    to: f32,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
}

impl Tween {
    #[must_use]
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            easing: Easing::default(),
        }
    }

    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    #[must_use]
    pub fn value(&self) -> f32 {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = self.elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.from + (self.to - self.from) * self.easing.apply(t)
    }

    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Moves the tween forward. Returns `true` while unfinished.
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        !self.is_finished()
    }
}

/// The value source of a scheduled animation.
#[derive(Debug, Clone)]
pub enum Motion {
    Spring(Spring),
    Tween(Tween),
}

impl Motion {
    #[must_use]
    pub fn value(&self) -> f32 {
        match self {
            Self::Spring(spring) => spring.value(),
            Self::Tween(tween) => tween.value(),
        }
    }

    /// Advances the motion. Returns `true` while still running.
    pub fn advance(&mut self, dt: Duration) -> bool {
        match self {
            Self::Spring(spring) => spring.advance(dt),
            Self::Tween(tween) => tween.advance(dt),
        }
    }
}

impl From<Spring> for Motion {
    fn from(spring: Spring) -> Self {
        Self::Spring(spring)
    }
}

impl From<Tween> for Motion {
    fn from(tween: Tween) -> Self {
        Self::Tween(tween)
    }
}
