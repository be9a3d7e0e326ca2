//! Cooperative cancellation of snippet evaluation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag checked before every snippet statement.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// A guard that cancels when dropped, e.g. with an abandoned request.
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop {
            cancellation: self.clone(),
        }
    }
}

/// Cancels its [`Cancellation`] when dropped.
#[derive(Debug)]
pub struct CancelOnDrop {
    cancellation: Cancellation,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if !self.cancellation.is_cancelled() {
            tracing::trace!("Cancelling snippet evaluation");
        }
        self.cancellation.cancel();
    }
}
