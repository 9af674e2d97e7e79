//! Cleanup beacons still in flight when the app goes away.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, warn};

type Delivery = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Spawned beacon deliveries, awaited together on the way out.
#[derive(Default)]
pub struct PendingBeacons {
    deliveries: Mutex<Vec<Delivery>>,
}

impl PendingBeacons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold on to a spawned delivery, usually its join handle.
    pub fn track<F>(&self, delivery: F)
    where
        F: Future + Send + 'static,
    {
        self.lock().push(Box::pin(async move {
            let _ = delivery.await;
        }));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait up to `within` for every tracked delivery. Returns false when
    /// some were still running at the deadline; those are dropped.
    pub async fn flush(&self, within: Duration) -> bool {
        let deliveries = std::mem::take(&mut *self.lock());
        if deliveries.is_empty() {
            return true;
        }

        let count = deliveries.len();
        let all = async move {
            for delivery in deliveries {
                delivery.await;
            }
        };
        match tokio::time::timeout(within, all).await {
            Ok(()) => {
                debug!("Flushed {} cleanup beacon(s)", count);
                true
            }
            Err(_) => {
                warn!("Gave up on {} cleanup beacon(s) after {:?}", count, within);
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Delivery>> {
        self.deliveries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn delivery(delay: Duration, landed: &Arc<AtomicUsize>) -> tokio::task::JoinHandle<()> {
        let landed = landed.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            landed.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_waits_for_deliveries() {
        let landed = Arc::new(AtomicUsize::new(0));
        let pending = PendingBeacons::new();
        pending.track(delivery(Duration::from_millis(200), &landed));
        pending.track(delivery(Duration::from_millis(900), &landed));
        assert_eq!(pending.len(), 2);

        assert!(pending.flush(Duration::from_millis(1500)).await);
        assert_eq!(landed.load(Ordering::SeqCst), 2);
        assert!(pending.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_gives_up_at_deadline() {
        let landed = Arc::new(AtomicUsize::new(0));
        let pending = PendingBeacons::new();
        pending.track(delivery(Duration::from_millis(100), &landed));
        pending.track(delivery(Duration::from_secs(30), &landed));

        let started = tokio::time::Instant::now();
        assert!(!pending.flush(Duration::from_millis(1500)).await);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(1500) && waited < Duration::from_secs(2));
        assert_eq!(landed.load(Ordering::SeqCst), 1);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_flush_with_nothing_pending() {
        assert!(PendingBeacons::new().flush(Duration::ZERO).await);
    }
}
