//! Stop signal shared by the health scheduler, the config watcher forwarder
//! and the demo request loop.

use tokio::sync::broadcast;

/// Broadcasts a single stop request to every background task of a running
/// balancer. Clones share the same channel.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver a task selects on next to its own work.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscribed task to stop. Returns how many were listening;
    /// zero is fine, the tasks may already be gone.
    pub fn trigger(&self) -> usize {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::debug!(tasks = notified, "Stop requested");
        notified
    }

    /// Tasks still holding a receiver.
    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
