use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared "render another frame" request.
///
/// Cloneable and `Send`; any holder may request a frame from any thread. The
/// render loop consumes the request with [`take`](Self::take).
#[derive(Debug, Clone, Default)]
pub struct RenderTrigger {
    pending: Arc<AtomicBool>,
}

impl RenderTrigger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn request(&self) {
        self.pending.store(true, Ordering::Release);
    }

    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Clears the request, returning whether one was pending.
    #[inline]
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}
