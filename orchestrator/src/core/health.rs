//! Rolling health window
//!
//! Fixed-size window of recent outcome/latency samples for one provider.
//! Pure bookkeeping; the shared, concurrent tracker lives in
//! `services::health_tracker`.

use std::collections::VecDeque;

/// When a provider counts as unhealthy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthPolicy {
    /// Samples kept per provider
    pub window_size: usize,
    /// A provider is never marked unhealthy with fewer samples than this
    pub min_samples: usize,
    /// Success rate below which the provider is unhealthy
    pub unhealthy_below: f64,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            window_size: 20,
            min_samples: 5,
            unhealthy_below: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSample {
    pub success: bool,
    pub latency_ms: u64,
}

#[derive(Debug, Clone)]
pub struct HealthWindow {
    samples: VecDeque<HealthSample>,
    capacity: usize,
    healthy: bool,
}

impl HealthWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            healthy: true,
        }
    }

    /// Push a sample, evicting the oldest when full
    ///
    /// Returns the new health state when this sample flipped it.
    pub fn record(&mut self, sample: HealthSample, policy: &HealthPolicy) -> Option<bool> {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);

        let healthy = self.evaluate(policy);
        if healthy != self.healthy {
            self.healthy = healthy;
            Some(healthy)
        } else {
            None
        }
    }

    fn evaluate(&self, policy: &HealthPolicy) -> bool {
        self.samples.len() < policy.min_samples || self.success_rate() >= policy.unhealthy_below
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    /// Fraction of successful samples; 1.0 for an empty window
    pub fn success_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 1.0;
        }
        let successes = self.samples.iter().filter(|s| s.success).count();
        successes as f64 / self.samples.len() as f64
    }

    /// Mean latency across all samples in the window
    pub fn average_latency_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: u64 = self.samples.iter().map(|s| s.latency_ms).sum();
        total as f64 / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
