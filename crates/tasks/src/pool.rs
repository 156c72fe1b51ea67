//! A bounded pool for jobs that must not stall the event loop.
//!
//! Sheet pushes and catalog lookups go through here: concurrency is capped
//! by a semaphore, every attempt gets a timeout, and the timeout doubles
//! on each retry. When the attempts run out the job fails with
//! `FailedJob` and the caller's warning hook fires — the user is told to
//! fix the sheet by hand rather than silently losing the write.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use rampart_core::{Error, Result};

/// Timeout and retry schedule for pooled jobs.
#[derive(Debug, Clone, Copy)]
pub struct JobPolicy {
    /// Timeout of the first attempt.
    pub base_timeout: Duration,
    /// Total attempts before the job fails.
    pub attempts: u32,
}

impl Default for JobPolicy {
    fn default() -> Self {
        Self { base_timeout: Duration::from_secs(2), attempts: 3 }
    }
}

impl JobPolicy {
    /// Timeout of a given 0-based attempt: base doubled per retry.
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        self.base_timeout * 2u32.saturating_pow(attempt)
    }
}

/// The bounded retrying job pool.
#[derive(Clone)]
pub struct JobPool {
    permits: Arc<Semaphore>,
    policy: JobPolicy,
}

impl JobPool {
    /// A pool allowing `workers` concurrent jobs under the default policy.
    pub fn new(workers: usize) -> Self {
        Self::with_policy(workers, JobPolicy::default())
    }

    /// A pool with an explicit policy.
    pub fn with_policy(workers: usize, policy: JobPolicy) -> Self {
        Self { permits: Arc::new(Semaphore::new(workers.max(1))), policy }
    }

    /// Run `job` under the pool's policy.
    ///
    /// The factory is called once per attempt; a timed-out attempt is
    /// abandoned and retried with double the timeout.
    pub async fn run<T, F, Fut>(&self, name: &str, mut job: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Internal("job pool closed".into()))?;

        let mut last: Option<Error> = None;
        for attempt in 0..self.policy.attempts {
            let timeout = self.policy.timeout_for(attempt);
            match tokio::time::timeout(timeout, job()).await {
                Ok(Ok(value)) => {
                    if attempt > 0 {
                        info!(job = name, attempt, "job recovered after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(err)) if err.is_retryable() => {
                    warn!(job = name, attempt, %err, "job failed, will retry");
                    last = Some(err);
                }
                Ok(Err(err)) => return Err(err),
                Err(_) => {
                    warn!(job = name, attempt, ?timeout, "job timed out, will retry");
                    last = Some(Error::Remote(format!("{name} timed out after {timeout:?}")));
                }
            }
        }

        let cause = last.map(|e| e.to_string()).unwrap_or_else(|| "no attempts".into());
        Err(Error::FailedJob(format!("{name}: {cause}")))
    }

    /// Like [`JobPool::run`] but calling `on_fail` with the failure text
    /// when the attempts run out; the error is still returned.
    pub async fn run_or_warn<T, F, Fut, W>(&self, name: &str, job: F, on_fail: W) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        W: FnOnce(&str),
    {
        match self.run(name, job).await {
            Err(err @ Error::FailedJob(_)) => {
                on_fail(&err.to_string());
                Err(err)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_pool() -> JobPool {
        JobPool::with_policy(
            2,
            JobPolicy { base_timeout: Duration::from_millis(50), attempts: 3 },
        )
    }

    #[tokio::test]
    async fn retries_until_success() {
        let pool = fast_pool();
        let calls = AtomicU32::new(0);

        let result = pool
            .run("flaky", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Remote("down".into()))
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_warns_and_fails() {
        let pool = fast_pool();
        let warned = std::sync::Mutex::new(None);

        let result: Result<()> = pool
            .run_or_warn(
                "doomed",
                || async { Err(Error::Remote("still down".into())) },
                |text| *warned.lock().unwrap() = Some(text.to_string()),
            )
            .await;

        assert!(matches!(result, Err(Error::FailedJob(_))));
        assert!(warned.lock().unwrap().as_deref().unwrap().contains("doomed"));
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_fast() {
        let pool = fast_pool();
        let calls = AtomicU32::new(0);

        let result: Result<()> = pool
            .run("hard-fail", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::ValidationFail("bad".into()))
            })
            .await;

        assert!(matches!(result, Err(Error::ValidationFail(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_double_per_attempt() {
        let pool = JobPool::with_policy(
            1,
            JobPolicy { base_timeout: Duration::from_secs(2), attempts: 3 },
        );

        let started = tokio::time::Instant::now();
        let result: Result<()> = pool
            .run("sleepy", || async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(Error::FailedJob(_))));
        // 2s + 4s + 8s of virtual time.
        assert_eq!(started.elapsed(), Duration::from_secs(14));
    }
}
