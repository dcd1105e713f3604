//! Shared types for the IP intelligence lookup system
//!
//! Contains the data model exchanged between provider adapters, the
//! orchestrator and the correlation engine, plus the small utilities every
//! component needs (cancellation, IP validation, tracing setup).

pub mod cancel;
pub mod errors;
pub mod ip;
pub mod logging;
pub mod types;

pub use cancel::CancellationSignal;
pub use errors::*;
pub use ip::{normalize_ip, NormalizedIp};
pub use types::*;
