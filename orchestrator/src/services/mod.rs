//! Service implementations
//!
//! Real implementations of the service traits plus the provider registry.

pub mod api_keys;
pub mod health_tracker;
pub mod registry;

#[cfg(test)]
mod tests;

pub use api_keys::{RealApiKeySource, StaticApiKeySource};
pub use health_tracker::{HealthReporter, RollingHealthTracker};
pub use registry::{ProviderConfig, ProviderRegistry, RegistryBuilder, RegistryEntry};
