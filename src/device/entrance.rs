//! Entrance animation planning.

use std::f32::consts::FRAC_PI_2;
use std::time::Duration;

use super::descriptor::EntranceKind;
use crate::motion::{AnimatedProperty, AnimationTarget, Spring, SpringConfig};
use crate::scene::NodeHandle;

/// Spacing between consecutive devices' entrances.
pub const STAGGER: Duration = Duration::from_millis(300);
/// Extra wait before a hinge starts opening.
pub const HINGE_EXTRA_DELAY: Duration = Duration::from_millis(300);
/// How far below its target a `spring-up` device starts.
pub const SPRING_UP_DROP: f32 = 1.0;
/// Name of the part a `hinge-open` entrance rotates.
pub const HINGE_PART: &str = "Frame";

/// Start delay for the device at sequence `index`.
#[must_use]
pub fn entrance_delay(kind: EntranceKind, index: usize, show_delay: Duration) -> Duration {
    let steps = u32::try_from(index).unwrap_or(u32::MAX);
    let base = STAGGER.saturating_mul(steps).saturating_add(show_delay);
    match kind {
        EntranceKind::HingeOpen => base.saturating_add(HINGE_EXTRA_DELAY),
        EntranceKind::None | EntranceKind::SpringUp => base,
    }
}

/// A scheduled entrance: where it writes, what drives it, when it starts.
#[derive(Debug, Clone)]
pub struct EntrancePlan {
    pub target: AnimationTarget,
    /// Value to pose the node at before the delay elapses.
    pub initial: f32,
    pub spring: Spring,
    pub delay: Duration,
}

/// Plans the entrance for a device.
///
/// `root` is the device root resting at `rest_y`; `hinge` is its
/// [`HINGE_PART`] node, if present. Returns `None` when nothing animates.
#[must_use]
pub fn plan(
    kind: EntranceKind,
    index: usize,
    show_delay: Duration,
    root: NodeHandle,
    rest_y: f32,
    hinge: Option<NodeHandle>,
) -> Option<EntrancePlan> {
    let delay = entrance_delay(kind, index, show_delay);
    match kind {
        EntranceKind::None => None,
        EntranceKind::SpringUp => {
            let initial = rest_y - SPRING_UP_DROP;
            Some(EntrancePlan {
                target: AnimationTarget::new(root, AnimatedProperty::PositionY),
                initial,
                spring: Spring::toward(initial, rest_y, SpringConfig::SPRING_UP),
                delay,
            })
        }
        EntranceKind::HingeOpen => {
            let frame = hinge?;
            Some(EntrancePlan {
                target: AnimationTarget::new(frame, AnimatedProperty::RotationX),
                initial: FRAC_PI_2,
                spring: Spring::toward(FRAC_PI_2, 0.0, SpringConfig::HINGE_OPEN),
                delay,
            })
        }
    }
}
