//! Adapter construction errors
//!
//! Lookup-time failures are `shared::ProviderFailure`; these errors only occur
//! while building adapters from configuration.

use thiserror::Error;

/// Result type for adapter construction
pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Unknown provider: {provider}")]
    UnknownProvider { provider: String },

    #[error("Invalid base URL for {provider}: {reason}")]
    InvalidBaseUrl { provider: String, reason: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}
