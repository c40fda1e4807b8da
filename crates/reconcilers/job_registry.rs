use std::time::Duration;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{
    errors::{VisioError, VisioResult},
    value_objects::provider_jobs::{CallbackUpdate, JobState, ProviderJob},
};

#[derive(Debug, Clone)]
struct RegisteredJob {
    job: ProviderJob,
    registered_at: Instant,
    /// The submitting turn stopped waiting (timeout); a result arriving now is late.
    abandoned: bool,
}

/// What a callback did to the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// First terminal result for a job someone is waiting on.
    Applied(ProviderJob),
    /// First terminal result for a job whose waiter already gave up.
    Late(ProviderJob),
    /// Duplicate delivery; the stored job is unchanged.
    AlreadyTerminal(ProviderJob),
    /// Progress update, stored but nothing resolves yet.
    NotTerminal,
    /// Terminal result for an id not registered yet; held until the submitter registers it.
    Buffered,
    UnknownJob,
}

/// Upper bound on terminal callbacks held for ids nobody registered.
pub const MAX_EARLY_CALLBACKS: usize = 256;

#[derive(Debug, Clone)]
struct EarlyCallback {
    job: ProviderJob,
    received_at: Instant,
}

/// Process-local map from provider job id to job, shared by the submitting turn and the
/// inbound callback handler. Entries are written pending once and resolved at most once.
///
/// A provider can answer before its submit response has been read, so a terminal callback
/// for an unregistered id is held briefly and applied on registration.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: DashMap<String, RegisteredJob>,
    early: DashMap<String, EarlyCallback>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pending placeholder unless the id is already known, and returns the
    /// stored job either way.
    pub fn register_pending(&self, job_id: &str) -> ProviderJob {
        // The `jobs` entry lock is taken before `early` here and in `update_from_callback`.
        let entry = self
            .jobs
            .entry(job_id.to_string())
            .or_insert_with(|| {
                let job = match self.early.remove(job_id) {
                    Some((_, early)) => {
                        debug!(%job_id, status = %early.job.status(), "job_registry: early callback applied");
                        early.job
                    }
                    None => ProviderJob::submitted(job_id),
                };
                RegisteredJob {
                    job,
                    registered_at: Instant::now(),
                    abandoned: false,
                }
            });

        entry.job.clone()
    }

    pub fn update_from_callback(&self, update: CallbackUpdate) -> CallbackOutcome {
        let mut occupied = match self.jobs.entry(update.job_id) {
            Entry::Occupied(occupied) => occupied,
            Entry::Vacant(vacant) => return self.hold_early(vacant.key(), update.state),
        };

        let registered = occupied.get_mut();
        if registered.job.is_terminal() {
            return CallbackOutcome::AlreadyTerminal(registered.job.clone());
        }

        let terminal = update.state.is_terminal();
        registered.job.apply(update.state);

        match (terminal, registered.abandoned) {
            (false, _) => CallbackOutcome::NotTerminal,
            (true, false) => CallbackOutcome::Applied(registered.job.clone()),
            (true, true) => CallbackOutcome::Late(registered.job.clone()),
        }
    }

    fn hold_early(&self, job_id: &str, state: JobState) -> CallbackOutcome {
        if !state.is_terminal() {
            return CallbackOutcome::UnknownJob;
        }
        if self.early.contains_key(job_id) {
            return CallbackOutcome::Buffered;
        }
        if self.early.len() >= MAX_EARLY_CALLBACKS {
            warn!(%job_id, held = self.early.len(), "job_registry: early callback buffer full");
            return CallbackOutcome::UnknownJob;
        }

        let mut job = ProviderJob::submitted(job_id);
        job.apply(state);
        self.early.insert(
            job_id.to_string(),
            EarlyCallback {
                job,
                received_at: Instant::now(),
            },
        );
        CallbackOutcome::Buffered
    }

    pub fn get_result(&self, job_id: &str) -> VisioResult<ProviderJob> {
        self.jobs
            .get(job_id)
            .map(|registered| registered.job.clone())
            .ok_or_else(|| VisioError::NotFound(format!("provider job {}", job_id)))
    }

    /// Keeps the entry so a late callback is still recognised until the TTL sweep.
    pub fn mark_abandoned(&self, job_id: &str) {
        if let Some(mut registered) = self.jobs.get_mut(job_id) {
            registered.abandoned = true;
        }
    }

    pub fn evict(&self, job_id: &str) -> Option<ProviderJob> {
        self.jobs
            .remove(job_id)
            .map(|(_, registered)| registered.job)
    }

    /// Drops every entry registered more than `ttl` ago and returns how many went.
    pub fn evict_older_than(&self, ttl: Duration) -> usize {
        let before = self.jobs.len() + self.early.len();
        self.jobs
            .retain(|_, registered| registered.registered_at.elapsed() < ttl);
        self.early
            .retain(|_, early| early.received_at.elapsed() < ttl);
        let evicted = before.saturating_sub(self.jobs.len() + self.early.len());

        if evicted > 0 {
            info!(evicted, remaining = self.jobs.len(), "job_registry: swept stale jobs");
        } else {
            debug!(remaining = self.jobs.len(), "job_registry: nothing to sweep");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{enums::job_statuses::JobStatus, provider_jobs::JobState};
    use std::sync::Arc;

    fn ready(job_id: &str, url: &str) -> CallbackUpdate {
        CallbackUpdate {
            job_id: job_id.to_string(),
            state: JobState::Ready {
                result_url: url.to_string(),
                duration_seconds: None,
            },
        }
    }

    #[test]
    fn duplicate_callback_leaves_the_first_result() {
        let registry = JobRegistry::new();
        registry.register_pending("job-1");

        let first = registry.update_from_callback(ready("job-1", "https://cdn/a.mp4"));
        let stored_once = registry.get_result("job-1").unwrap();
        let second = registry.update_from_callback(ready("job-1", "https://cdn/b.mp4"));
        let stored_twice = registry.get_result("job-1").unwrap();

        assert!(matches!(first, CallbackOutcome::Applied(_)));
        assert!(matches!(second, CallbackOutcome::AlreadyTerminal(_)));
        assert_eq!(stored_once, stored_twice);
        assert_eq!(stored_twice.result_url(), Some("https://cdn/a.mp4"));
    }

    #[test]
    fn unknown_progress_update_is_ignored() {
        let registry = JobRegistry::new();

        let outcome = registry.update_from_callback(CallbackUpdate {
            job_id: "ghost".into(),
            state: JobState::Processing,
        });

        assert_eq!(outcome, CallbackOutcome::UnknownJob);
        assert!(registry.is_empty());
        assert!(matches!(registry.get_result("ghost"), Err(VisioError::NotFound(_))));
    }

    #[test]
    fn result_arriving_before_registration_is_applied_on_register() {
        let registry = JobRegistry::new();

        let outcome = registry.update_from_callback(CallbackUpdate {
            job_id: "job-1".into(),
            state: JobState::Failed {
                error_message: "audio unreadable".into(),
            },
        });
        assert_eq!(outcome, CallbackOutcome::Buffered);
        assert!(registry.get_result("job-1").is_err());

        let job = registry.register_pending("job-1");

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.error_message(), Some("audio unreadable"));
        assert_eq!(registry.get_result("job-1").unwrap(), job);
    }

    #[test]
    fn early_buffer_is_bounded() {
        let registry = JobRegistry::new();
        for i in 0..MAX_EARLY_CALLBACKS {
            registry.update_from_callback(ready(&format!("early-{i}"), "https://cdn/a.mp4"));
        }

        let outcome = registry.update_from_callback(ready("one-too-many", "https://cdn/a.mp4"));

        assert_eq!(outcome, CallbackOutcome::UnknownJob);
        assert_eq!(registry.register_pending("one-too-many").status(), JobStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_unclaimed_early_callbacks() {
        let registry = JobRegistry::new();
        registry.update_from_callback(ready("orphan", "https://cdn/a.mp4"));
        tokio::time::advance(Duration::from_secs(901)).await;

        assert_eq!(registry.evict_older_than(Duration::from_secs(900)), 1);
        assert_eq!(registry.register_pending("orphan").status(), JobStatus::Pending);
    }

    #[test]
    fn register_pending_does_not_reset_a_resolved_job() {
        let registry = JobRegistry::new();
        registry.register_pending("job-1");
        registry.update_from_callback(ready("job-1", "https://cdn/a.mp4"));

        let job = registry.register_pending("job-1");

        assert_eq!(job.status(), JobStatus::Ready);
    }

    #[test]
    fn progress_callbacks_do_not_resolve() {
        let registry = JobRegistry::new();
        registry.register_pending("job-1");

        let outcome = registry.update_from_callback(CallbackUpdate {
            job_id: "job-1".into(),
            state: JobState::Processing,
        });

        assert_eq!(outcome, CallbackOutcome::NotTerminal);
        assert_eq!(registry.get_result("job-1").unwrap().status(), JobStatus::Processing);
    }

    #[test]
    fn result_after_abandon_is_reported_late() {
        let registry = JobRegistry::new();
        registry.register_pending("job-1");
        registry.mark_abandoned("job-1");

        let outcome = registry.update_from_callback(ready("job-1", "https://cdn/a.mp4"));

        assert!(matches!(outcome, CallbackOutcome::Late(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_stale_entries() {
        let registry = JobRegistry::new();
        registry.register_pending("old");
        tokio::time::advance(Duration::from_secs(600)).await;
        registry.register_pending("fresh");
        tokio::time::advance(Duration::from_secs(400)).await;

        let evicted = registry.evict_older_than(Duration::from_secs(900));

        assert_eq!(evicted, 1);
        assert!(registry.get_result("old").is_err());
        assert!(registry.get_result("fresh").is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callbacks_resolve_exactly_once() {
        let registry = Arc::new(JobRegistry::new());
        registry.register_pending("job-1");

        let handles = (0..16)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry.update_from_callback(ready("job-1", &format!("https://cdn/{i}.mp4")))
                })
            })
            .collect::<Vec<_>>();

        let mut applied = 0;
        for handle in handles {
            if let CallbackOutcome::Applied(_) = handle.await.unwrap() {
                applied += 1;
            }
        }

        assert_eq!(applied, 1);
    }
}
