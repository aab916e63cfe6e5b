use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

/// Whether a failure should be retried under backoff, or is fatal and must
/// propagate immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

/// An operation was classified as fatal (programmer failure: bad SQL, bad
/// arguments) rather than transient. Unlike a transient failure, this is
/// never retried — it bubbles straight out of [`BackoffPolicy::run`].
#[derive(Debug)]
pub struct Fatal<E>(pub E);

/// Naive geometric backoff, unbounded retry count.
///
/// Sleep schedule: `t_i = min(start_sleep_time * factor^i, border_sleep_time)`.
/// There is no retry ceiling — callers only hand this policy idempotent
/// reads (DB queries, sink upserts), so looping forever on a down
/// dependency is the correct behavior until it recovers.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub start_sleep_time: Duration,
    pub factor: f64,
    pub border_sleep_time: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            start_sleep_time: Duration::from_millis(100),
            factor: 2.0,
            border_sleep_time: Duration::from_secs(10),
        }
    }
}

impl BackoffPolicy {
    pub fn new(start_sleep_time: Duration, factor: f64, border_sleep_time: Duration) -> Self {
        Self {
            start_sleep_time,
            factor,
            border_sleep_time,
        }
    }

    /// Runs `op` under this policy: retries forever on [`RetryDisposition::Retry`],
    /// returns immediately on [`RetryDisposition::Stop`] (the failure is
    /// fatal and must not be retried).
    pub async fn run<F, Fut, T, E, Classifier>(
        &self,
        mut op: F,
        classify: Classifier,
    ) -> Result<T, Fatal<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        let mut attempt: u32 = 0;

        loop {
            match op().await {
                Ok(result) => return Ok(result),
                Err(err) => match classify(&err) {
                    RetryDisposition::Stop => {
                        error!(%err, "fatal error, not retrying");
                        return Err(Fatal(err));
                    }
                    RetryDisposition::Retry => {
                        let delay = self.delay_for(attempt);
                        warn!(%err, attempt, delay_ms = delay.as_millis() as u64, "retrying after transient failure");
                        sleep(delay).await;
                        attempt = attempt.saturating_add(1);
                    }
                },
            }
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let start_ms = self.start_sleep_time.as_secs_f64() * 1000.0;
        let border_ms = self.border_sleep_time.as_secs_f64() * 1000.0;
        let grown_ms = start_ms * self.factor.powi(attempt as i32);
        Duration::from_secs_f64(grown_ms.min(border_ms).max(0.0) / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Debug, Clone, PartialEq)]
    struct TestError(&'static str);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[test]
    fn delay_schedule_grows_geometrically_then_caps() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), 2.0, Duration::from_secs(10));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        // 100 * 2^7 = 12800ms, capped at the 10s border.
        assert_eq!(policy.delay_for(7), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn retries_transient_failure_until_success() {
        let policy = BackoffPolicy::new(Duration::from_millis(0), 2.0, Duration::from_millis(0));
        let attempts = Arc::new(AtomicUsize::new(0));
        let op_attempts = attempts.clone();

        let result = policy
            .run(
                move || {
                    let op_attempts = op_attempts.clone();
                    async move {
                        let attempt = op_attempts.fetch_add(1, Ordering::SeqCst);
                        if attempt < 4 {
                            Err(TestError("transient"))
                        } else {
                            Ok::<&'static str, TestError>("connected")
                        }
                    }
                },
                |_: &TestError| RetryDisposition::Retry,
            )
            .await;

        assert_eq!(result.unwrap(), "connected");
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn fatal_failure_propagates_without_retrying() {
        let policy = BackoffPolicy::default();
        let attempts = Arc::new(AtomicUsize::new(0));
        let op_attempts = attempts.clone();

        let result = policy
            .run(
                move || {
                    let op_attempts = op_attempts.clone();
                    async move {
                        op_attempts.fetch_add(1, Ordering::SeqCst);
                        Err::<(), TestError>(TestError("bad sql"))
                    }
                },
                |err: &TestError| match err.0 {
                    "bad sql" => RetryDisposition::Stop,
                    _ => RetryDisposition::Retry,
                },
            )
            .await;

        match result {
            Err(Fatal(TestError(msg))) => assert_eq!(msg, "bad sql"),
            Ok(_) => panic!("expected fatal error"),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
