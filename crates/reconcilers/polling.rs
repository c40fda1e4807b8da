use std::future::Future;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::{
    domain::{
        errors::{VisioError, VisioResult},
        value_objects::provider_jobs::ProviderJob,
    },
    providers::ProviderError,
    reconcilers::ReconcilePolicy,
};

/// Calls `status_fn` until the job is terminal or `policy.max_wait` has elapsed.
///
/// A failed job is returned as `Ok`; the caller decides what a failure means. Transient
/// status errors are logged and retried on the next tick, fatal ones abort the wait.
/// The deadline is checked before every sleep, so the call returns `Timeout` no later than
/// `max_wait + poll_interval` after it started.
pub async fn wait_for_job<F, Fut>(
    job_id: &str,
    mut status_fn: F,
    policy: ReconcilePolicy,
) -> VisioResult<ProviderJob>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<ProviderJob, ProviderError>>,
{
    let started = Instant::now();
    let deadline = started + policy.max_wait;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match status_fn(job_id.to_string()).await {
            Ok(job) if job.is_terminal() => {
                debug!(%job_id, attempt, status = %job.status(), "reconciler: job terminal");
                return Ok(job);
            }
            Ok(job) => {
                debug!(%job_id, attempt, status = %job.status(), "reconciler: job not ready yet");
            }
            Err(err) if err.is_transient() => {
                warn!(%job_id, attempt, error = %err, "reconciler: status check failed, retrying");
            }
            Err(err) => return Err(err.into()),
        }

        let now = Instant::now();
        if now >= deadline {
            let waited_ms = now.duration_since(started).as_millis() as u64;
            warn!(%job_id, attempt, waited_ms, "reconciler: gave up waiting for job");
            return Err(VisioError::Timeout {
                job_id: job_id.to_string(),
                waited_ms,
            });
        }

        sleep(policy.poll_interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::provider_jobs::JobState;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };
    use std::time::Duration;

    fn policy(interval_ms: u64, max_ms: u64) -> ReconcilePolicy {
        ReconcilePolicy::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(max_ms),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn returns_as_soon_as_the_job_is_ready() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let job = wait_for_job(
            "job-1",
            move |job_id| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    let state = if n < 2 {
                        JobState::Processing
                    } else {
                        JobState::Ready {
                            result_url: "https://cdn.example.com/v.mp4".into(),
                            duration_seconds: Some(4.2),
                        }
                    };
                    Ok(ProviderJob::observed(job_id, state))
                }
            },
            policy(5_000, 300_000),
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(job.result_url(), Some("https://cdn.example.com/v.mp4"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_is_a_result_not_an_error() {
        let job = wait_for_job(
            "job-2",
            |job_id| async move {
                Ok(ProviderJob::observed(
                    job_id,
                    JobState::Failed {
                        error_message: "face not detected".into(),
                    },
                ))
            },
            policy(1_000, 10_000),
        )
        .await
        .unwrap();

        assert_eq!(job.error_message(), Some("face not detected"));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_within_max_wait_plus_one_interval() {
        let started = Instant::now();

        let result = wait_for_job(
            "job-3",
            |job_id| async move { Ok(ProviderJob::observed(job_id, JobState::Processing)) },
            policy(3_000, 10_000),
        )
        .await;

        let elapsed = started.elapsed();
        assert!(matches!(result, Err(VisioError::Timeout { ref job_id, .. }) if job_id == "job-3"));
        assert!(elapsed >= Duration::from_millis(10_000));
        assert!(elapsed <= Duration::from_millis(13_000));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let job = wait_for_job(
            "job-4",
            move |job_id| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ProviderError::Status {
                            status: 502,
                            body: "bad gateway".into(),
                        })
                    } else {
                        Ok(ProviderJob::observed(
                            job_id,
                            JobState::Ready {
                                result_url: "https://cdn.example.com/w.mp4".into(),
                                duration_seconds: None,
                            },
                        ))
                    }
                }
            },
            policy(1_000, 10_000),
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(job.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_abort_the_wait() {
        let result = wait_for_job(
            "job-5",
            |_job_id| async move { Err(ProviderError::Generate("unknown video".into())) },
            policy(1_000, 10_000),
        )
        .await;

        assert!(matches!(result, Err(VisioError::Generate(_))));
    }
}
