//! `ipintel` command line entry point
//!
//! Looks up one IP address across every configured provider and prints the
//! correlated record as JSON on stdout. Progress and logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use orchestrator::config::{
    build_registry, default_provider_specs, fixture_registry, load_provider_specs, LookupSettings,
    DEFAULT_GLOBAL_DEADLINE, DEFAULT_PROVIDER_TIMEOUT, DEFAULT_TTL_SECONDS,
};
use orchestrator::services::RealApiKeySource;
use orchestrator::{correlate, LookupOrchestrator, ProgressTracker, ProviderSelection, RollingHealthTracker};
use shared::{logging, normalize_ip, ProviderId, SourceTag};

/// Correlated IP intelligence from multiple providers
#[derive(Parser)]
#[command(name = "ipintel")]
#[command(about = "Query IP intelligence providers concurrently and merge their answers")]
pub struct Args {
    /// IPv4 or IPv6 address to look up
    pub ip: String,

    /// Query only these providers (comma separated); bypasses the health filter
    #[arg(long, value_delimiter = ',')]
    pub providers: Vec<String>,

    /// JSON provider configuration file (built-in table when omitted)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Record time-to-live in seconds
    #[arg(long, default_value_t = DEFAULT_TTL_SECONDS)]
    pub ttl: u64,

    /// Global lookup deadline in milliseconds
    #[arg(long, default_value_t = DEFAULT_GLOBAL_DEADLINE.as_millis() as u64)]
    pub deadline_ms: u64,

    /// Default per-provider timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_PROVIDER_TIMEOUT.as_millis() as u64)]
    pub timeout_ms: u64,

    /// Source tag stamped on the record (live, cache, db, stale)
    #[arg(long, default_value = "live")]
    pub source: SourceTag,

    /// Use built-in fixture providers instead of live vendors
    #[arg(long)]
    pub fixture: bool,

    /// Query providers even when they are marked unhealthy
    #[arg(long)]
    pub include_unhealthy: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Print a progress line to stderr as each provider finishes
    #[arg(long)]
    pub progress: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logging::init_tracing_with_level(Some(&args.log_level));
    logging::log_startup("ipintel lookup");

    let ip = normalize_ip(&args.ip).with_context(|| format!("cannot look up {}", args.ip))?;
    let ip = ip.to_string();

    let settings = LookupSettings {
        global_deadline: Duration::from_millis(args.deadline_ms),
        provider_timeout: Duration::from_millis(args.timeout_ms),
        ttl_seconds: args.ttl,
        source: args.source,
        skip_unhealthy: !args.include_unhealthy,
        ..Default::default()
    };
    settings.validate()?;

    let registry = if args.fixture {
        fixture_registry(settings.provider_timeout)?
    } else {
        let specs = match &args.config {
            Some(path) => load_provider_specs(path)
                .with_context(|| format!("failed to load provider config {}", path.display()))?,
            None => default_provider_specs(),
        };
        build_registry(&specs, &RealApiKeySource::new(), settings.provider_timeout)?
    };
    let registry = Arc::new(registry);
    info!(providers = registry.len(), "Provider registry ready");

    let health = Arc::new(RollingHealthTracker::for_registry(&registry, settings.health));
    let orchestrator = LookupOrchestrator::new(Arc::clone(&registry), health, settings.orchestrator_settings());

    let selection = if args.providers.is_empty() {
        ProviderSelection::AllEnabled
    } else {
        ProviderSelection::Only(args.providers.iter().map(ProviderId::new).collect())
    };

    let mut run = orchestrator.start(&ip, &selection, CancellationToken::new());

    // Ctrl+C aborts pending providers; the record is still printed
    let canceller = run.canceller();
    let interrupt = tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                logging::log_shutdown("Received Ctrl+C, cancelling lookup");
                canceller.cancel();
            }
            Err(err) => logging::log_error("Signal handling", &err),
        }
    });

    let mut progress = ProgressTracker::new(run.total());
    while let Some(notice) = run.next_notice().await {
        progress.observe(&notice);
        if args.progress {
            eprintln!("{}", progress.render());
        }
    }

    let outcomes = run.finish().await?;
    interrupt.abort();

    let record = correlate(&ip, &outcomes, settings.source, settings.ttl_seconds);

    for health in orchestrator.shutdown().await {
        debug!(
            provider = %health.provider,
            enabled = health.enabled,
            healthy = health.healthy,
            success_rate = health.success_rate,
            average_latency_ms = health.average_latency_ms,
            samples = health.samples,
            "Provider health"
        );
    }

    println!("{}", serde_json::to_string_pretty(&record)?);
    logging::log_success(&format!(
        "{} providers answered for {} (confidence {})",
        record.metadata.providers_succeeded,
        record.ip,
        record.confidence()
    ));
    Ok(())
}
