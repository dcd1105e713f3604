//! Progress consumer for completion notices

use shared::{CompletionNotice, ProviderId};

/// Folds completion notices into `(completed, total)` counts
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    succeeded: usize,
    finished: Vec<ProviderId>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: 0,
            finished: Vec::with_capacity(total),
        }
    }

    /// Record a notice; repeated notices for the same provider are ignored
    pub fn observe(&mut self, notice: &CompletionNotice) -> bool {
        if self.finished.contains(&notice.provider) {
            return false;
        }
        self.finished.push(notice.provider.clone());
        if notice.success {
            self.succeeded += 1;
        }
        true
    }

    pub fn completed(&self) -> usize {
        self.finished.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn is_complete(&self) -> bool {
        self.completed() >= self.total
    }

    /// Providers in the order they finished
    pub fn finished(&self) -> &[ProviderId] {
        &self.finished
    }

    pub fn render(&self) -> String {
        let failed = self.completed() - self.succeeded;
        match self.finished.last() {
            Some(last) => format!(
                "[{}/{}] {} done ({} ok, {} failed)",
                self.completed(),
                self.total,
                last,
                self.succeeded,
                failed
            ),
            None => format!("[0/{}] waiting for providers", self.total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(provider: &str, success: bool) -> CompletionNotice {
        CompletionNotice {
            provider: ProviderId::new(provider),
            success,
        }
    }

    #[test]
    fn test_counts_follow_notices() {
        let mut progress = ProgressTracker::new(3);
        assert_eq!(progress.render(), "[0/3] waiting for providers");

        progress.observe(&notice("ip-api", true));
        progress.observe(&notice("abuseipdb", false));

        assert_eq!(progress.completed(), 2);
        assert_eq!(progress.succeeded(), 1);
        assert!(!progress.is_complete());
        assert_eq!(progress.render(), "[2/3] abuseipdb done (1 ok, 1 failed)");

        progress.observe(&notice("ipinfo", true));
        assert!(progress.is_complete());
        let order: Vec<&str> = progress.finished().iter().map(|p| p.as_str()).collect();
        assert_eq!(order, vec!["ip-api", "abuseipdb", "ipinfo"]);
    }

    #[test]
    fn test_duplicate_notice_is_ignored() {
        let mut progress = ProgressTracker::new(2);
        assert!(progress.observe(&notice("ipinfo", true)));
        assert!(!progress.observe(&notice("ipinfo", true)));
        assert_eq!(progress.completed(), 1);
    }
}
