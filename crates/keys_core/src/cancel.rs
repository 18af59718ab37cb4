use std::sync::Arc;

use tokio::sync::watch;

/// Cooperative cancellation shared by every sequence a presenter starts.
///
/// Work checks the scope between steps; a call already handed to an
/// interactor is never interrupted.
#[derive(Debug, Clone)]
pub struct CancelScope {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelScope {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
