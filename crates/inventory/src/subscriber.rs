//! Synchronous alert subscribers.
//!
//! Subscribers are called in registration order, on the mutating caller's
//! thread, once the mutation has released its item lock. A subscriber that
//! errors or panics is logged and skipped; the remaining subscribers still
//! receive the alert. Slow consumers belong on the event bus instead.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::alert::LowStockAlert;

/// Receives newly raised low-stock alerts.
pub trait AlertSubscriber: Send + Sync {
    fn on_alert(&self, alert: &LowStockAlert) -> anyhow::Result<()>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> AlertSubscriber for F
where
    F: Fn(&LowStockAlert) -> anyhow::Result<()> + Send + Sync,
{
    fn on_alert(&self, alert: &LowStockAlert) -> anyhow::Result<()> {
        self(alert)
    }
}

/// Handle returned by registration; used to unsubscribe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Outcome of delivering one alert to every subscriber.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriberId, Arc<dyn AlertSubscriber>)>>,
}

impl core::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, subscriber: Arc<dyn AlertSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match self.subscribers.write() {
            Ok(mut subs) => subs.push((id, subscriber)),
            Err(_) => tracing::warn!("subscriber registry poisoned; registration dropped"),
        }
        id
    }

    /// Returns `false` if the id was not registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let Ok(mut subs) = self.subscribers.write() else {
            return false;
        };
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() < before
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().map(|subs| subs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `alert` to every subscriber, isolating failures.
    pub fn notify(&self, alert: &LowStockAlert) -> DeliveryReport {
        // Call outside the lock so a subscriber may (un)register others.
        let subscribers: Vec<Arc<dyn AlertSubscriber>> = match self.subscribers.read() {
            Ok(subs) => subs.iter().map(|(_, s)| Arc::clone(s)).collect(),
            Err(_) => {
                tracing::warn!("subscriber registry poisoned; alert not delivered");
                return DeliveryReport::default();
            }
        };

        let mut report = DeliveryReport::default();
        for subscriber in subscribers {
            match catch_unwind(AssertUnwindSafe(|| subscriber.on_alert(alert))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    tracing::warn!(
                        subscriber = subscriber.name(),
                        alert_id = %alert.id_typed(),
                        error = %err,
                        "alert subscriber failed"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(
                        subscriber = subscriber.name(),
                        alert_id = %alert.id_typed(),
                        "alert subscriber panicked"
                    );
                }
            }
        }
        report
    }
}
