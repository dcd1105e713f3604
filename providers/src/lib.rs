//! Provider adapters for IP intelligence lookups
//!
//! Each adapter is a thin translator from one vendor's response to the shared
//! `PartialResult` shape. The orchestrator only ever sees the `ProviderAdapter`
//! capability, so vendors can be added without touching the lookup core.

pub mod error;
pub mod services;
pub mod traits;
pub mod types;

// Re-export main types
pub use error::{ProviderError, ProviderResult};
pub use services::*;
pub use traits::*;
pub use types::AdapterSettings;
