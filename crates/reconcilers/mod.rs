//! Turning asynchronously completing provider jobs into one terminal result.

pub mod job_registry;
pub mod polling;

use std::time::Duration;

use crate::domain::value_objects::provider_jobs::CompletionMode;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5_000);
pub const DEFAULT_WEBHOOK_POLL_INTERVAL: Duration = Duration::from_millis(1_500);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(300_000);

/// Wait policy for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl ReconcilePolicy {
    pub fn new(poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            poll_interval,
            max_wait,
        }
    }
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_WAIT)
    }
}

/// Policies for both delivery modes. Webhook jobs are read from the local registry, so
/// they can be checked far more often than a provider API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicies {
    pub polling: ReconcilePolicy,
    pub webhook: ReconcilePolicy,
}

impl ReconcilePolicies {
    pub fn for_mode(&self, mode: CompletionMode) -> ReconcilePolicy {
        match mode {
            CompletionMode::Polling => self.polling,
            CompletionMode::Webhook => self.webhook,
        }
    }
}

impl Default for ReconcilePolicies {
    fn default() -> Self {
        Self {
            polling: ReconcilePolicy::default(),
            webhook: ReconcilePolicy::new(DEFAULT_WEBHOOK_POLL_INTERVAL, DEFAULT_MAX_WAIT),
        }
    }
}
