//! Placeholder overlay: the temporary low-resolution copy of a device's
//! screen shown while the full-resolution texture streams in.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::render::TextureId;
use crate::scene::NodeHandle;

/// Offset of the overlay in front of the screen, in local Z.
pub const OVERLAY_OFFSET: f32 = 0.001;
/// Cross-fade duration from overlay to full-resolution screen.
pub const FADE_DURATION: Duration = Duration::from_millis(500);
/// Name given to the overlay node.
pub const OVERLAY_NAME: &str = "Screen Placeholder";

/// One-shot cancellation flag shared with whatever may act on the overlay.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels; returns `true` only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A live overlay node and the texture only it references.
#[derive(Debug)]
pub struct PlaceholderOverlay {
    pub node: NodeHandle,
    pub texture: TextureId,
    pub token: CancellationToken,
}

impl PlaceholderOverlay {
    #[must_use]
    pub fn new(node: NodeHandle, texture: TextureId) -> Self {
        Self {
            node,
            texture,
            token: CancellationToken::new(),
        }
    }
}
