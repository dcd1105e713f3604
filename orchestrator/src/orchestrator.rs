//! Lookup orchestrator
//!
//! Fans one IP lookup out to every selected provider on its own Tokio task,
//! each bound to a child of the lookup's cancellation signal (global deadline
//! plus the provider's own timeout). A collector task gathers outcomes as they
//! arrive, emits a completion notice per provider in real completion order and
//! turns anything still pending at the deadline into a timeout.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, Stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use shared::{
    CancellationSignal, CompletionNotice, CorrelatedRecord, ProviderFailure, ProviderHealth, ProviderId,
    ProviderOutcome, SourceTag, TrustRank,
};

use crate::core::correlation::correlate;
use crate::error::OrchestratorResult;
use crate::services::health_tracker::HealthReporter;
use crate::services::registry::{ProviderRegistry, RegistryEntry};
use crate::traits::HealthTracker;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Hard ceiling for a whole lookup
    pub global_deadline: Duration,
    /// Leave out providers the health tracker considers degraded
    pub skip_unhealthy: bool,
    /// Pending health updates before new ones are dropped
    pub health_queue_capacity: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            global_deadline: Duration::from_secs(10),
            skip_unhealthy: true,
            health_queue_capacity: 256,
        }
    }
}

/// Which providers a lookup should query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProviderSelection {
    /// Every enabled provider, minus unhealthy ones when configured
    #[default]
    AllEnabled,
    /// Exactly these providers; bypasses the health filter but never `enabled = false`
    Only(Vec<ProviderId>),
}

/// Concurrent fan-out over the provider registry
pub struct LookupOrchestrator<H>
where
    H: HealthTracker + 'static,
{
    registry: Arc<ProviderRegistry>,
    health: Arc<H>,
    reporter: HealthReporter,
    drain: JoinHandle<()>,
    settings: OrchestratorSettings,
}

impl<H> LookupOrchestrator<H>
where
    H: HealthTracker + 'static,
{
    /// Create the orchestrator and start its health reporter
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(registry: Arc<ProviderRegistry>, health: Arc<H>, settings: OrchestratorSettings) -> Self {
        let (reporter, drain) = HealthReporter::spawn(Arc::clone(&health), settings.health_queue_capacity);
        Self {
            registry,
            health,
            reporter,
            drain,
            settings,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Stop the health reporter once every queued sample has been applied
    ///
    /// Waits for unfinished runs to drop their reporter handles, then returns
    /// the final health snapshot.
    pub async fn shutdown(self) -> Vec<ProviderHealth> {
        drop(self.reporter);
        if let Err(err) = self.drain.await {
            warn!(error = %err, "Health reporter task failed");
        }
        self.health.snapshot()
    }

    /// Resolve a selection against the registry and health state
    pub fn select_providers(&self, selection: &ProviderSelection) -> Vec<Arc<RegistryEntry>> {
        match selection {
            ProviderSelection::AllEnabled => self
                .registry
                .enabled()
                .filter(|entry| {
                    if self.settings.skip_unhealthy && !self.health.is_healthy(&entry.id) {
                        info!(provider = %entry.id, "⏭️ Skipping unhealthy provider");
                        return false;
                    }
                    true
                })
                .cloned()
                .collect(),
            ProviderSelection::Only(requested) => {
                let mut seen = BTreeSet::new();
                requested
                    .iter()
                    .filter(|id| seen.insert((*id).clone()))
                    .filter_map(|id| match self.registry.get(id) {
                        None => {
                            warn!(provider = %id, "Unknown provider requested, skipping");
                            None
                        }
                        Some(entry) if !entry.enabled => {
                            warn!(provider = %id, "Requested provider is disabled, skipping");
                            None
                        }
                        Some(entry) => Some(Arc::clone(entry)),
                    })
                    .collect()
            }
        }
    }

    /// Dispatch a lookup and return immediately with a handle to it
    ///
    /// Cancelling `cancel` aborts every pending provider call; their outcomes
    /// are recorded as cancelled.
    pub fn start(&self, ip: &str, selection: &ProviderSelection, cancel: CancellationToken) -> LookupRun {
        let lookup_id = Uuid::new_v4();
        let span = info_span!("lookup", %lookup_id, ip);
        let providers = self.select_providers(selection);
        let total = providers.len();

        let started = Instant::now();
        let signal = CancellationSignal::with_token(cancel.child_token(), started + self.settings.global_deadline);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        span.in_scope(|| {
            if total == 0 {
                warn!("No providers available for lookup");
            } else {
                info!(providers = total, "🔎 Starting lookup");
            }
        });

        let mut pending = BTreeMap::new();
        for entry in providers {
            let child = signal.child_with_timeout(entry.config.timeout);
            pending.insert(
                entry.id.clone(),
                PendingProvider {
                    trust_rank: entry.trust_rank,
                    signal: child.clone(),
                },
            );
            let tx = outcome_tx.clone();
            let ip = ip.to_string();
            tokio::spawn(dispatch(entry, ip, child, tx).instrument(span.clone()));
        }
        drop(outcome_tx);

        let collector = Collector {
            pending,
            outcomes: outcome_rx,
            notices: notice_tx,
            signal: signal.clone(),
            reporter: self.reporter.clone(),
            started,
        };
        let collector = tokio::spawn(collector.run().instrument(span));

        LookupRun {
            lookup_id,
            total,
            notices: notice_rx,
            signal,
            collector,
        }
    }

    /// Run a lookup to completion and return every provider's outcome
    pub async fn run(&self, ip: &str, selection: &ProviderSelection) -> OrchestratorResult<Vec<ProviderOutcome>> {
        self.start(ip, selection, CancellationToken::new()).finish().await
    }

    /// Run a lookup and correlate the outcomes into one record
    pub async fn lookup(
        &self,
        ip: &str,
        selection: &ProviderSelection,
        source: SourceTag,
        ttl_seconds: u64,
    ) -> OrchestratorResult<CorrelatedRecord> {
        let outcomes = self.run(ip, selection).await?;
        Ok(correlate(ip, &outcomes, source, ttl_seconds))
    }
}

/// Handle to an in-flight lookup
pub struct LookupRun {
    lookup_id: Uuid,
    total: usize,
    notices: mpsc::UnboundedReceiver<CompletionNotice>,
    signal: CancellationSignal,
    collector: JoinHandle<Vec<ProviderOutcome>>,
}

impl LookupRun {
    pub fn lookup_id(&self) -> Uuid {
        self.lookup_id
    }

    /// Number of providers dispatched
    pub fn total(&self) -> usize {
        self.total
    }

    /// Next completion notice; `None` once every provider is accounted for
    pub async fn next_notice(&mut self) -> Option<CompletionNotice> {
        self.notices.recv().await
    }

    /// Completion notices as a stream, in real completion order
    pub fn notices(&mut self) -> impl Stream<Item = CompletionNotice> + '_ {
        stream::unfold(&mut self.notices, |rx| async move { rx.recv().await.map(|notice| (notice, rx)) })
    }

    /// Abort every pending provider call
    pub fn cancel(&self) {
        self.signal.cancel();
    }

    /// Token that aborts this lookup when cancelled, e.g. from a signal handler
    pub fn canceller(&self) -> CancellationToken {
        self.signal.token().clone()
    }

    /// Wait for the collector and return all outcomes in completion order
    pub async fn finish(self) -> OrchestratorResult<Vec<ProviderOutcome>> {
        Ok(self.collector.await?)
    }
}

struct PendingProvider {
    trust_rank: TrustRank,
    signal: CancellationSignal,
}

async fn dispatch(
    entry: Arc<RegistryEntry>,
    ip: String,
    signal: CancellationSignal,
    tx: mpsc::UnboundedSender<ProviderOutcome>,
) {
    let started = Instant::now();
    debug!(provider = %entry.id, timeout_ms = signal.remaining().as_millis() as u64, "Dispatching");

    let result = if signal.is_cancelled() {
        Err(signal.failure())
    } else {
        tokio::select! {
            biased;
            _ = signal.cancelled() => Err(signal.failure()),
            result = entry.adapter.lookup(&ip, &signal) => result,
        }
    };

    let latency_ms = elapsed_ms(started);
    let outcome = match result {
        Ok(result) => ProviderOutcome::success(entry.id.clone(), entry.trust_rank, latency_ms, result),
        Err(reason) => ProviderOutcome::failure(entry.id.clone(), entry.trust_rank, latency_ms, reason),
    };

    // The collector is gone once the global deadline has passed
    if tx.send(outcome).is_err() {
        debug!(provider = %entry.id, "Outcome arrived after lookup finished");
    }
}

struct Collector {
    pending: BTreeMap<ProviderId, PendingProvider>,
    outcomes: mpsc::UnboundedReceiver<ProviderOutcome>,
    notices: mpsc::UnboundedSender<CompletionNotice>,
    signal: CancellationSignal,
    reporter: HealthReporter,
    started: Instant,
}

impl Collector {
    async fn run(mut self) -> Vec<ProviderOutcome> {
        let mut collected = Vec::with_capacity(self.pending.len());
        let mut aborted = false;

        while !self.pending.is_empty() {
            tokio::select! {
                biased;
                received = self.outcomes.recv() => match received {
                    Some(outcome) => {
                        if self.pending.remove(&outcome.provider).is_some() {
                            collected.push(self.complete(outcome));
                        }
                    }
                    None => {
                        aborted = true;
                        break;
                    }
                },
                _ = self.signal.cancelled() => break,
            }
        }

        let reason = if aborted {
            ProviderFailure::VendorError("lookup task aborted".to_string())
        } else {
            self.signal.failure()
        };
        let latency_ms = elapsed_ms(self.started);
        for (provider, pending) in std::mem::take(&mut self.pending) {
            pending.signal.cancel();
            warn!(provider = %provider, reason = %reason, latency_ms, "Provider did not finish in time");
            let outcome = ProviderOutcome::failure(provider, pending.trust_rank, latency_ms, reason.clone());
            collected.push(self.complete(outcome));
        }

        let succeeded = collected.iter().filter(|o| o.is_success()).count();
        info!(
            succeeded,
            total = collected.len(),
            latency_ms = elapsed_ms(self.started),
            "Lookup finished"
        );
        collected
    }

    fn complete(&self, outcome: ProviderOutcome) -> ProviderOutcome {
        match outcome.failure_reason() {
            None => info!(provider = %outcome.provider, latency_ms = outcome.latency_ms, "✅ Provider completed"),
            Some(reason) => {
                warn!(provider = %outcome.provider, latency_ms = outcome.latency_ms, reason = %reason, "❌ Provider failed")
            }
        }

        self.reporter.report(&outcome.provider, outcome.is_success(), outcome.latency_ms);
        // Nobody listening for progress is fine
        let _ = self.notices.send(outcome.notice());
        outcome
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registry::ProviderConfig;
    use crate::traits::MockHealthTracker;
    use providers::{FixtureAdapter, ProviderAdapter};
    use shared::PartialResult;

    fn registry() -> Arc<ProviderRegistry> {
        let adapter = |id: &str| -> Arc<dyn ProviderAdapter> { Arc::new(FixtureAdapter::new(id, PartialResult::default())) };
        Arc::new(
            ProviderRegistry::builder()
                .register(adapter("alpha"), 5, true, ProviderConfig::default())
                .register(adapter("beta"), 7, true, ProviderConfig::default())
                .register(adapter("gamma"), 9, false, ProviderConfig::default())
                .build()
                .unwrap(),
        )
    }

    fn health(unhealthy: &'static str) -> Arc<MockHealthTracker> {
        let mut health = MockHealthTracker::new();
        health.expect_is_healthy().returning(move |id| id.as_str() != unhealthy);
        health.expect_record().returning(|_, _, _| ());
        health.expect_snapshot().returning(Vec::new);
        Arc::new(health)
    }

    fn ids(entries: &[Arc<RegistryEntry>]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_all_enabled_skips_disabled_and_unhealthy() {
        let orchestrator = LookupOrchestrator::new(registry(), health("beta"), OrchestratorSettings::default());
        let selected = orchestrator.select_providers(&ProviderSelection::AllEnabled);
        assert_eq!(ids(&selected), vec!["alpha"]);
    }

    #[tokio::test]
    async fn test_health_filter_can_be_turned_off() {
        let settings = OrchestratorSettings {
            skip_unhealthy: false,
            ..Default::default()
        };
        let orchestrator = LookupOrchestrator::new(registry(), health("beta"), settings);
        let selected = orchestrator.select_providers(&ProviderSelection::AllEnabled);
        assert_eq!(ids(&selected), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_explicit_selection_overrides_health_only() {
        let orchestrator = LookupOrchestrator::new(registry(), health("beta"), OrchestratorSettings::default());
        let selection = ProviderSelection::Only(vec![
            ProviderId::new("beta"),
            ProviderId::new("gamma"),
            ProviderId::new("missing"),
            ProviderId::new("BETA"),
        ]);

        let selected = orchestrator.select_providers(&selection);
        assert_eq!(ids(&selected), vec!["beta"]);
    }
}
