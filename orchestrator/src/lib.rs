//! IP intelligence lookup engine
//!
//! Dispatches one lookup to every enabled provider concurrently, tolerates
//! partial failure and fuses the answers into a single correlated record with
//! a confidence score and a trail of every disagreement between providers.

pub mod config;
pub mod core;
pub mod error;
pub mod orchestrator;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use crate::core::{correlate, correlate_at, HealthPolicy, ProgressTracker};
pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{LookupOrchestrator, LookupRun, OrchestratorSettings, ProviderSelection};
pub use services::{ProviderRegistry, RollingHealthTracker};
pub use traits::{ApiKeySource, HealthTracker};
