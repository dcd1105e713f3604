//! Service-specific tests
//!
//! Tests that touch process-wide state (environment, working directory)
//! live here rather than next to the services.

#[cfg(test)]
mod api_keys;
