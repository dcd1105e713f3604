//! Orchestrator-specific error types
//!
//! Provider failures never show up here: they are absorbed into the lookup
//! outcomes. These errors cover startup (configuration, registry) and the
//! lookup task itself.

use thiserror::Error;

use providers::ProviderError;
use shared::SharedError;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Configuration error: {field}: {reason}")]
    ConfigurationError { field: String, reason: String },

    #[error("Provider registered twice: {provider}")]
    DuplicateProvider { provider: String },

    #[error("Invalid trust rank {rank} for {provider}: must be a positive integer")]
    InvalidTrustRank { provider: String, rank: u8 },

    #[error("Provider adapter error: {0}")]
    ProviderError(#[from] ProviderError),

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Lookup task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl OrchestratorError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigurationError {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
