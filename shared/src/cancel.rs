//! Cancellation signal passed down through every provider call
//!
//! A signal combines an explicit cancel flag (a `CancellationToken`) with an
//! absolute deadline. Adapters check it before starting I/O and race their
//! requests against `cancelled()`.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::types::ProviderFailure;

#[derive(Debug, Clone)]
pub struct CancellationSignal {
    token: CancellationToken,
    deadline: Instant,
}

impl CancellationSignal {
    /// Create a root signal that expires after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self::with_token(CancellationToken::new(), Instant::now() + timeout)
    }

    /// Wrap an existing caller-owned token, e.g. one cancelled when a UI request aborts
    pub fn with_token(token: CancellationToken, deadline: Instant) -> Self {
        Self { token, deadline }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Cancel this signal and every child derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves when the signal is cancelled or its deadline passes
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = sleep_until(self.deadline) => {}
        }
    }

    /// Derive a child bounded by both this signal's deadline and `timeout`
    ///
    /// Cancelling the parent cancels the child; cancelling the child leaves
    /// the parent untouched.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let deadline = std::cmp::min(self.deadline, Instant::now() + timeout);
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    /// Failure to record for a call interrupted by this signal
    pub fn failure(&self) -> ProviderFailure {
        if self.token.is_cancelled() {
            ProviderFailure::Cancelled
        } else {
            ProviderFailure::Timeout
        }
    }
}
