//! Provider adapter capability

use async_trait::async_trait;

use shared::{CancellationSignal, PartialResult, ProviderFailure, ProviderId};

/// A single intelligence source that can answer "what do you know about this IP?"
///
/// Implementations must respect `cancel` promptly, both before starting I/O
/// and while waiting on it. "No data for this IP" is not an error: return an
/// empty `PartialResult` unless the vendor itself reported a failure.
#[mockall::automock]
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Registry identifier of this adapter
    fn id(&self) -> ProviderId;

    /// Look up one already-validated IP
    async fn lookup(&self, ip: &str, cancel: &CancellationSignal) -> Result<PartialResult, ProviderFailure>;
}
