//! Core lookup logic
//!
//! Pure, synchronous building blocks with no I/O: field correlation, the
//! rolling health window and progress accounting.

pub mod correlation;
pub mod health;
pub mod progress;

pub use correlation::{compute_confidence, correlate, correlate_at, derive_risk_level};
pub use health::{HealthPolicy, HealthSample, HealthWindow};
pub use progress::ProgressTracker;
