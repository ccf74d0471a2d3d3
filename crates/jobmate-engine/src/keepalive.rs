//! Periodic liveness pings while a run is in flight.
//!
//! Long generations can outlive the idle-suspend threshold of
//! extension-style hosts. The runner keeps a pinger alive for exactly the
//! duration of the streaming request and releases it on every exit path.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::trace;

/// Receiver of keepalive pings.
///
/// Hosts plug their wake-up mechanism in here; the engine only guarantees
/// the cadence and the lifetime.
pub trait KeepalivePing: Send + Sync {
    fn ping(&self);
}

/// Default ping: a trace-level heartbeat, visible but inert.
#[derive(Debug, Default)]
pub struct TracePing;

impl KeepalivePing for TracePing {
    fn ping(&self) {
        trace!("keepalive ping");
    }
}

/// Spawner for the per-run ping task.
pub struct Keepalive;

impl Keepalive {
    /// Starts pinging every `interval`, first ping one interval from now.
    ///
    /// Must be called from within a tokio runtime. The returned guard stops
    /// the pinger when consumed by [`KeepaliveGuard::stop`] or when dropped,
    /// so the task is released exactly once on every exit path.
    pub fn start(interval: Duration, ping: Arc<dyn KeepalivePing>) -> KeepaliveGuard {
        // Anchor the cadence to the call, not to the first poll of the task.
        let first = time::Instant::now() + interval;
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(first, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                ping.ping();
            }
        });
        KeepaliveGuard { task }
    }
}

/// Handle owning the ping task.
///
/// Consuming [`stop`](Self::stop) makes a second stop unrepresentable;
/// the `Drop` impl covers early returns and error paths.
pub struct KeepaliveGuard {
    task: JoinHandle<()>,
}

impl KeepaliveGuard {
    pub fn stop(self) {}
}

impl Drop for KeepaliveGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::task::yield_now;
    use tokio::time::advance;

    #[derive(Default)]
    struct CountingPing {
        pings: AtomicUsize,
    }

    impl CountingPing {
        fn count(&self) -> usize {
            self.pings.load(Ordering::SeqCst)
        }
    }

    impl KeepalivePing for CountingPing {
        fn ping(&self) {
            self.pings.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pings_at_the_configured_cadence() {
        let ping = Arc::new(CountingPing::default());
        let guard = Keepalive::start(Duration::from_secs(20), ping.clone());

        advance(Duration::from_secs(19)).await;
        yield_now().await;
        assert_eq!(ping.count(), 0);

        advance(Duration::from_secs(1)).await;
        yield_now().await;
        assert_eq!(ping.count(), 1);

        advance(Duration::from_secs(20)).await;
        yield_now().await;
        advance(Duration::from_secs(20)).await;
        yield_now().await;
        assert_eq!(ping.count(), 3);

        guard.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_pinging() {
        let ping = Arc::new(CountingPing::default());
        let guard = Keepalive::start(Duration::from_secs(5), ping.clone());

        advance(Duration::from_secs(5)).await;
        yield_now().await;
        assert_eq!(ping.count(), 1);

        guard.stop();
        yield_now().await;
        advance(Duration::from_secs(60)).await;
        yield_now().await;
        assert_eq!(ping.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_releases_like_stop() {
        let ping = Arc::new(CountingPing::default());
        {
            let _guard = Keepalive::start(Duration::from_secs(5), ping.clone());
            advance(Duration::from_secs(5)).await;
            yield_now().await;
        }
        yield_now().await;
        advance(Duration::from_secs(60)).await;
        yield_now().await;
        assert_eq!(ping.count(), 1);
    }
}
