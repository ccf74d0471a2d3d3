//! Cooperative cancellation for in-flight runs.

use tokio::sync::watch;

/// Creates a linked handle/signal pair for one or more runs.
pub fn cancel_channel() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Caller-side switch that aborts a run.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Run-side signal that resolves once cancellation was requested.
///
/// Dropping the handle without cancelling never resolves the signal, so an
/// abandoned handle cannot abort a run.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Completes when cancellation is requested, even if it already was.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Handle dropped without cancelling; nothing can arrive anymore.
            std::future::pending::<()>().await;
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_resolves_the_signal() {
        let (handle, mut signal) = cancel_channel();
        assert!(!signal.is_cancelled());
        handle.cancel();
        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_observed_late_still_fires() {
        let (handle, mut signal) = cancel_channel();
        handle.cancel();
        handle.cancel();
        signal.cancelled().await;
        // A second wait on an already-cancelled signal resolves too.
        signal.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_never_resolves() {
        let (handle, mut signal) = cancel_channel();
        drop(handle);
        let waited =
            tokio::time::timeout(Duration::from_millis(50), signal.cancelled()).await;
        assert!(waited.is_err());
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn cloned_signals_share_the_handle() {
        let (handle, signal) = cancel_channel();
        let mut first = signal.clone();
        let mut second = signal;
        handle.cancel();
        first.cancelled().await;
        second.cancelled().await;
    }
}
