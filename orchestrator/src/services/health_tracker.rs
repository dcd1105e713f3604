//! Shared health tracker and its fire-and-forget reporter
//!
//! The provider map is fixed at construction from the registry; each
//! provider's window sits behind its own mutex so concurrent lookups only
//! contend per provider, and only for the length of a push.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use shared::{ProviderHealth, ProviderId, TrustRank};
use crate::core::health::{HealthPolicy, HealthSample, HealthWindow};
use crate::services::registry::ProviderRegistry;
use crate::traits::HealthTracker;

struct ProviderSlot {
    enabled: bool,
    trust_rank: TrustRank,
    window: Mutex<HealthWindow>,
}

impl ProviderSlot {
    fn new(enabled: bool, trust_rank: TrustRank, policy: &HealthPolicy) -> Self {
        Self {
            enabled,
            trust_rank,
            window: Mutex::new(HealthWindow::new(policy.window_size)),
        }
    }
}

/// Real health tracker with in-memory rolling windows
pub struct RollingHealthTracker {
    policy: HealthPolicy,
    slots: RwLock<BTreeMap<ProviderId, Arc<ProviderSlot>>>,
}

impl RollingHealthTracker {
    pub fn new(policy: HealthPolicy) -> Self {
        Self {
            policy,
            slots: RwLock::new(BTreeMap::new()),
        }
    }

    /// Pre-register every provider in the registry
    pub fn for_registry(registry: &ProviderRegistry, policy: HealthPolicy) -> Self {
        let slots = registry
            .entries()
            .map(|entry| {
                (
                    entry.id.clone(),
                    Arc::new(ProviderSlot::new(entry.enabled, entry.trust_rank, &policy)),
                )
            })
            .collect();
        Self {
            policy,
            slots: RwLock::new(slots),
        }
    }

    fn slot(&self, provider: &ProviderId) -> Option<Arc<ProviderSlot>> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.get(provider).cloned()
    }

    fn slot_or_insert(&self, provider: &ProviderId) -> Arc<ProviderSlot> {
        if let Some(slot) = self.slot(provider) {
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(provider.clone())
            .or_insert_with(|| Arc::new(ProviderSlot::new(true, 0, &self.policy)))
            .clone()
    }
}

impl HealthTracker for RollingHealthTracker {
    fn is_healthy(&self, provider: &ProviderId) -> bool {
        match self.slot(provider) {
            Some(slot) => slot.window.lock().unwrap_or_else(|e| e.into_inner()).is_healthy(),
            None => true,
        }
    }

    fn record(&self, provider: &ProviderId, success: bool, latency_ms: u64) {
        let slot = self.slot_or_insert(provider);
        let transition = {
            let mut window = slot.window.lock().unwrap_or_else(|e| e.into_inner());
            window.record(HealthSample { success, latency_ms }, &self.policy)
        };

        match transition {
            Some(false) => warn!(provider = %provider, "⚠️ Provider marked unhealthy"),
            Some(true) => info!(provider = %provider, "✅ Provider recovered"),
            None => {}
        }
    }

    fn snapshot(&self) -> Vec<ProviderHealth> {
        let slots: Vec<(ProviderId, Arc<ProviderSlot>)> = {
            let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
            slots.iter().map(|(id, slot)| (id.clone(), Arc::clone(slot))).collect()
        };

        slots
            .into_iter()
            .map(|(provider, slot)| {
                let window = slot.window.lock().unwrap_or_else(|e| e.into_inner());
                ProviderHealth {
                    provider,
                    enabled: slot.enabled,
                    healthy: window.is_healthy(),
                    trust_rank: slot.trust_rank,
                    success_rate: window.success_rate(),
                    average_latency_ms: window.average_latency_ms(),
                    samples: window.len(),
                }
            })
            .collect()
    }
}

#[derive(Debug)]
struct HealthUpdate {
    provider: ProviderId,
    success: bool,
    latency_ms: u64,
}

/// Non-blocking handle for pushing outcomes to the health tracker
///
/// Updates go through a bounded queue drained by a background task. A full
/// queue drops the sample instead of applying backpressure to lookups.
#[derive(Clone)]
pub struct HealthReporter {
    tx: mpsc::Sender<HealthUpdate>,
}

impl HealthReporter {
    /// Spawn the draining task; must be called inside a Tokio runtime
    pub fn spawn<H>(tracker: Arc<H>, capacity: usize) -> (Self, JoinHandle<()>)
    where
        H: HealthTracker + ?Sized + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<HealthUpdate>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                tracker.record(&update.provider, update.success, update.latency_ms);
            }
            debug!("Health reporter stopped");
        });
        (Self { tx }, handle)
    }

    pub fn report(&self, provider: &ProviderId, success: bool, latency_ms: u64) {
        let update = HealthUpdate {
            provider: provider.clone(),
            success,
            latency_ms,
        };
        match self.tx.try_send(update) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(update)) => {
                debug!(provider = %update.provider, "Health queue full, dropping sample");
            }
            Err(mpsc::error::TrySendError::Closed(update)) => {
                debug!(provider = %update.provider, "Health reporter closed, dropping sample");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn strict_policy() -> HealthPolicy {
        HealthPolicy {
            window_size: 4,
            min_samples: 2,
            unhealthy_below: 0.5,
        }
    }

    #[test]
    fn test_unknown_provider_is_healthy_until_recorded() {
        let tracker = RollingHealthTracker::new(strict_policy());
        let provider = ProviderId::new("ipinfo");
        assert!(tracker.is_healthy(&provider));

        tracker.record(&provider, false, 100);
        tracker.record(&provider, false, 100);
        assert!(!tracker.is_healthy(&provider));
    }

    #[test]
    fn test_snapshot_reports_rates_and_latency() {
        let tracker = RollingHealthTracker::new(strict_policy());
        let provider = ProviderId::new("ip-api");
        tracker.record(&provider, true, 100);
        tracker.record(&provider, false, 300);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].provider, provider);
        assert_eq!(snapshot[0].samples, 2);
        assert_eq!(snapshot[0].success_rate, 0.5);
        assert_eq!(snapshot[0].average_latency_ms, 200.0);
        assert!(snapshot[0].healthy);
    }

    #[test]
    fn test_concurrent_records_are_all_counted() {
        let tracker = Arc::new(RollingHealthTracker::new(HealthPolicy {
            window_size: 1000,
            ..strict_policy()
        }));
        let provider = ProviderId::new("abuseipdb");

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let provider = provider.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        tracker.record(&provider, true, 10);
                        let _ = tracker.is_healthy(&provider);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(tracker.snapshot()[0].samples, 400);
    }

    #[tokio::test]
    async fn test_reporter_applies_updates_in_background() {
        let tracker = Arc::new(RollingHealthTracker::new(strict_policy()));
        let (reporter, handle) = HealthReporter::spawn(Arc::clone(&tracker), 16);
        let provider = ProviderId::new("ipinfo");

        reporter.report(&provider, true, 42);
        reporter.report(&provider, true, 58);
        drop(reporter);

        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot[0].samples, 2);
        assert_eq!(snapshot[0].average_latency_ms, 50.0);
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        let (tx, mut rx) = mpsc::channel::<HealthUpdate>(1);
        let reporter = HealthReporter { tx };
        let provider = ProviderId::new("ipinfo");

        // Nothing drains the queue; the second report must return immediately
        reporter.report(&provider, true, 1);
        reporter.report(&provider, false, 2);

        let kept = rx.try_recv().unwrap();
        assert_eq!(kept.provider, provider);
        assert!(kept.success);
        assert_eq!(kept.latency_ms, 1);
        assert!(matches!(rx.try_recv(), Err(mpsc::error::TryRecvError::Empty)));
    }
}
