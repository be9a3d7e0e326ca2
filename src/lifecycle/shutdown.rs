//! Shutdown coordination.

use tokio::sync::broadcast;

/// Broadcast handle that stops the HTTP server.
///
/// Tests and embedders trigger it instead of sending an OS signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// A receiver for [`crate::lifecycle::signals::shutdown_signal`].
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Stop every subscribed server. No-op when nothing listens.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of servers still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
