//! Retry with exponential backoff and jitter.
//!
//! Attempt `i` (1-indexed) that fails with a retryable error waits
//! `delay * backoff^(i-1)`, plus `unit * jitter` when a jitter bound is set,
//! before attempt `i + 1`. The final attempt's error is returned as-is;
//! nothing is wrapped or aggregated.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::errors::{ConfigError, ConfigResult};
use crate::domain::models::RetryConfig;
use crate::domain::ports::{AsyncSleeper, JitterSource, Level, Operation, Reporter, Sleeper};
use crate::infrastructure::{ThreadRngJitter, ThreadSleeper, TokioSleeper, TracingReporter};

type Classifier<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given duration, then try again.
    Retry(Duration),
    /// Retryable, but the attempt bound is reached.
    Exhausted,
    /// The failure is not retryable.
    Abort,
}

/// Retry schedule and classification. Pure data; the drivers below do the
/// sleeping and reporting.
pub struct RetryPolicy<E> {
    attempts: u32,
    delay: Duration,
    backoff: f64,
    jitter: Duration,
    retry_if: Option<Classifier<E>>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            attempts: self.attempts,
            delay: self.delay,
            backoff: self.backoff,
            jitter: self.jitter,
            retry_if: self.retry_if.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("attempts", &self.attempts)
            .field("delay", &self.delay)
            .field("backoff", &self.backoff)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

impl<E> RetryPolicy<E> {
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::default()
    }

    /// Policy from configuration; every failure is retryable.
    pub fn from_config(config: &RetryConfig) -> ConfigResult<Self> {
        Self::builder()
            .attempts(config.attempts)
            .delay(config.delay())
            .backoff(config.backoff)
            .jitter(config.jitter())
            .build()
    }

    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    pub const fn backoff(&self) -> f64 {
        self.backoff
    }

    pub const fn jitter(&self) -> Duration {
        self.jitter
    }

    pub fn is_retryable(&self, error: &E) -> bool {
        self.retry_if.as_ref().map_or(true, |retry_if| retry_if(error))
    }

    /// Wait after failed attempt `attempt` (1-indexed).
    ///
    /// Computed in whole nanoseconds and rounded, so integer multiples of
    /// the base delay come out exact. Saturates at `Duration::MAX`.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_for(&self, attempt: u32, jitter: &dyn JitterSource) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let mut nanos = self.delay.as_nanos() as f64 * self.backoff.powi(exponent);
        if !self.jitter.is_zero() {
            nanos += jitter.unit() * self.jitter.as_nanos() as f64;
        }

        if !nanos.is_finite() || nanos >= Duration::MAX.as_nanos() as f64 {
            return Duration::MAX;
        }
        let nanos = nanos.round() as u128;
        let secs = u64::try_from(nanos / 1_000_000_000).unwrap_or(u64::MAX);
        let subsec = u32::try_from(nanos % 1_000_000_000).unwrap_or(0);
        Duration::new(secs, subsec)
    }

    /// Classify the failure of attempt `attempt`.
    pub fn decide(&self, attempt: u32, error: &E, jitter: &dyn JitterSource) -> RetryDecision {
        if !self.is_retryable(error) {
            RetryDecision::Abort
        } else if attempt >= self.attempts {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Retry(self.delay_for(attempt, jitter))
        }
    }
}

/// Builder for [`RetryPolicy`]. Defaults: 3 attempts, no delay, backoff
/// 1.0, no jitter, every failure retryable.
pub struct RetryPolicyBuilder<E> {
    attempts: u32,
    delay: Duration,
    backoff: f64,
    jitter: Duration,
    retry_if: Option<Classifier<E>>,
}

impl<E> Default for RetryPolicyBuilder<E> {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::ZERO,
            backoff: 1.0,
            jitter: Duration::ZERO,
            retry_if: None,
        }
    }
}

impl<E> RetryPolicyBuilder<E> {
    #[must_use]
    pub const fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    #[must_use]
    pub const fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub const fn backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub const fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Only failures for which `predicate` returns true are retried.
    #[must_use]
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Some(Arc::new(predicate));
        self
    }

    pub fn build(self) -> ConfigResult<RetryPolicy<E>> {
        if self.attempts < 1 {
            return Err(ConfigError::InvalidAttempts(self.attempts));
        }
        if !self.backoff.is_finite() || self.backoff < 0.0 {
            return Err(ConfigError::InvalidBackoff(self.backoff));
        }
        Ok(RetryPolicy {
            attempts: self.attempts,
            delay: self.delay,
            backoff: self.backoff,
            jitter: self.jitter,
            retry_if: self.retry_if,
        })
    }
}

/// Report a failed attempt and return whether another attempt follows.
///
/// The error appears in its `Debug` form, so a string error is quoted.
fn report_failure<E: fmt::Debug>(
    reporter: &dyn Reporter,
    attempt: u32,
    error: &E,
    decision: RetryDecision,
) -> Option<Duration> {
    match decision {
        RetryDecision::Retry(wait) => {
            warn!(attempt, error = ?error, wait = ?wait, "attempt failed, retrying");
            reporter.report(&format!(
                "[retries] attempt {attempt} failed: {error:?}; sleeping {:.3}s",
                wait.as_secs_f64()
            ));
            Some(wait)
        }
        RetryDecision::Exhausted => {
            reporter.report(&format!("[retries] fail after {attempt} attempts: {error:?}"));
            None
        }
        RetryDecision::Abort => {
            debug!(attempt, error = ?error, "non-retryable failure, giving up");
            None
        }
    }
}

/// Blocking retry wrapper around an [`Operation`].
pub struct Retrying<Op, E> {
    inner: Op,
    policy: RetryPolicy<E>,
    sleeper: Arc<dyn Sleeper>,
    reporter: Arc<dyn Reporter>,
    jitter: Arc<dyn JitterSource>,
}

impl<Op, E> Retrying<Op, E> {
    /// Wrap `inner` with the thread sleeper, thread-rng jitter and a
    /// `tracing` reporter at warn level.
    pub fn new(inner: Op, policy: RetryPolicy<E>) -> Self {
        Self {
            inner,
            policy,
            sleeper: Arc::new(ThreadSleeper),
            reporter: Arc::new(TracingReporter::new(Level::Warn)),
            jitter: Arc::new(ThreadRngJitter),
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    pub const fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    pub const fn inner(&self) -> &Op {
        &self.inner
    }
}

impl<A, Op, E> Operation<A> for Retrying<Op, E>
where
    A: ?Sized,
    Op: Operation<A, Error = E>,
    E: fmt::Debug,
{
    type Output = Op::Output;
    type Error = E;

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn invoke(&self, args: &A) -> Result<Self::Output, Self::Error> {
        let mut attempt = 1;
        loop {
            match self.inner.invoke(args) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let decision = self.policy.decide(attempt, &err, &*self.jitter);
                    match report_failure(&*self.reporter, attempt, &err, decision) {
                        Some(wait) => {
                            self.sleeper.sleep(wait);
                            attempt += 1;
                        }
                        None => return Err(err),
                    }
                }
            }
        }
    }
}

/// Async retry driver for cooperative schedulers. The task is suspended,
/// not blocked, between attempts.
pub struct AsyncRetry<E> {
    policy: RetryPolicy<E>,
    sleeper: Arc<dyn AsyncSleeper>,
    reporter: Arc<dyn Reporter>,
    jitter: Arc<dyn JitterSource>,
}

impl<E: fmt::Debug> AsyncRetry<E> {
    pub fn new(policy: RetryPolicy<E>) -> Self {
        Self {
            policy,
            sleeper: Arc::new(TokioSleeper),
            reporter: Arc::new(TracingReporter::new(Level::Warn)),
            jitter: Arc::new(ThreadRngJitter),
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn AsyncSleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Run the future produced by `operation` until it succeeds, fails
    /// with a non-retryable error, or the attempt bound is reached.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let decision = self.policy.decide(attempt, &err, &*self.jitter);
                    match report_failure(&*self.reporter, attempt, &err, decision) {
                        Some(wait) => {
                            self.sleeper.sleep(wait).await;
                            attempt += 1;
                        }
                        None => return Err(err),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{RecordingReporter, RecordingSleeper, SeededJitter};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn no_jitter() -> f64 {
        0.0
    }

    #[test]
    fn test_builder_rejects_zero_attempts() {
        let err = RetryPolicy::<String>::builder().attempts(0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidAttempts(0));
    }

    #[test]
    fn test_builder_rejects_bad_backoff() {
        assert!(matches!(
            RetryPolicy::<String>::builder().backoff(-1.0).build(),
            Err(ConfigError::InvalidBackoff(_))
        ));
        assert!(matches!(
            RetryPolicy::<String>::builder().backoff(f64::NAN).build(),
            Err(ConfigError::InvalidBackoff(_))
        ));
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::<String>::builder()
            .attempts(6)
            .delay(Duration::from_millis(100))
            .backoff(2.0)
            .build()
            .unwrap();

        assert_eq!(policy.delay_for(1, &no_jitter), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2, &no_jitter), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3, &no_jitter), Duration::from_millis(400));
        assert_eq!(policy.delay_for(5, &no_jitter), Duration::from_millis(1600));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::<String>::builder()
            .attempts(u32::MAX)
            .delay(Duration::from_secs(1))
            .backoff(10.0)
            .build()
            .unwrap();
        assert_eq!(policy.delay_for(400, &no_jitter), Duration::MAX);
    }

    #[test]
    fn test_jitter_added_from_source() {
        let policy = RetryPolicy::<String>::builder()
            .delay(Duration::from_millis(100))
            .jitter(Duration::from_millis(50))
            .build()
            .unwrap();
        let half = || 0.5;
        assert_eq!(policy.delay_for(1, &half), Duration::from_millis(125));
    }

    #[test]
    fn test_jitter_source_untouched_without_bound() {
        let policy = RetryPolicy::<String>::builder()
            .delay(Duration::from_millis(10))
            .build()
            .unwrap();
        let calls = AtomicU32::new(0);
        let counting = || {
            calls.fetch_add(1, Ordering::SeqCst);
            0.9
        };
        assert_eq!(policy.delay_for(1, &counting), Duration::from_millis(10));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_decide() {
        let policy = RetryPolicy::<String>::builder()
            .attempts(2)
            .retry_if(|e: &String| e != "fatal")
            .build()
            .unwrap();

        assert_eq!(
            policy.decide(1, &"flaky".to_string(), &no_jitter),
            RetryDecision::Retry(Duration::ZERO)
        );
        assert_eq!(
            policy.decide(2, &"flaky".to_string(), &no_jitter),
            RetryDecision::Exhausted
        );
        assert_eq!(
            policy.decide(1, &"fatal".to_string(), &no_jitter),
            RetryDecision::Abort
        );
    }

    #[test]
    fn test_succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let flaky = |_: &()| -> Result<&'static str, String> {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("boom".to_string())
            } else {
                Ok("ok")
            }
        };
        let sleeper = Arc::new(RecordingSleeper::new());
        let policy = RetryPolicy::builder()
            .attempts(3)
            .delay(Duration::from_millis(100))
            .backoff(2.0)
            .build()
            .unwrap();

        let retrying = Retrying::new(flaky, policy).with_sleeper(sleeper.clone());

        assert_eq!(retrying.invoke(&()), Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[test]
    fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let always_fail = |_: &()| -> Result<(), String> {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err(format!("nope #{n}"))
        };
        let sleeper = Arc::new(RecordingSleeper::new());
        let reporter = Arc::new(RecordingReporter::new());
        let policy = RetryPolicy::builder().attempts(2).build().unwrap();

        let retrying = Retrying::new(always_fail, policy)
            .with_sleeper(sleeper.clone())
            .with_reporter(reporter.clone());

        assert_eq!(retrying.invoke(&()), Err("nope #2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sleeper.recorded().len(), 1);
        assert_eq!(
            reporter.lines(),
            vec![
                r#"[retries] attempt 1 failed: "nope #1"; sleeping 0.000s"#.to_string(),
                r#"[retries] fail after 2 attempts: "nope #2""#.to_string(),
            ]
        );
    }

    #[test]
    fn test_report_uses_debug_form_of_error() {
        #[derive(Debug)]
        enum Fault {
            Refused { port: u16 },
        }

        let reporter = Arc::new(RecordingReporter::new());
        let policy = RetryPolicy::builder()
            .attempts(2)
            .delay(Duration::from_millis(5))
            .build()
            .unwrap();
        let retrying = Retrying::new(
            |_: &()| -> Result<(), Fault> { Err(Fault::Refused { port: 8080 }) },
            policy,
        )
        .with_sleeper(Arc::new(RecordingSleeper::new()))
        .with_reporter(reporter.clone())
        .with_jitter(Arc::new(no_jitter));

        assert!(retrying.invoke(&()).is_err());
        assert_eq!(
            reporter.lines(),
            vec![
                "[retries] attempt 1 failed: Refused { port: 8080 }; sleeping 0.005s".to_string(),
                "[retries] fail after 2 attempts: Refused { port: 8080 }".to_string(),
            ]
        );
    }

    #[test]
    fn test_non_retryable_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let op = |_: &()| -> Result<(), String> {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("fatal".to_string())
        };
        let sleeper = Arc::new(RecordingSleeper::new());
        let reporter = Arc::new(RecordingReporter::new());
        let policy = RetryPolicy::builder()
            .attempts(5)
            .retry_if(|e: &String| e != "fatal")
            .build()
            .unwrap();

        let retrying = Retrying::new(op, policy)
            .with_sleeper(sleeper.clone())
            .with_reporter(reporter.clone());

        assert_eq!(retrying.invoke(&()), Err("fatal".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.recorded().is_empty());
        assert!(reporter.lines().is_empty());
    }

    #[test]
    fn test_single_attempt_never_sleeps() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let policy = RetryPolicy::builder().attempts(1).build().unwrap();
        let retrying = Retrying::new(|_: &()| -> Result<(), String> { Err("x".into()) }, policy)
            .with_sleeper(sleeper.clone());

        assert!(retrying.invoke(&()).is_err());
        assert!(sleeper.recorded().is_empty());
    }

    #[test]
    fn test_seeded_jitter_sequence_is_reproducible() {
        let run = || {
            let sleeper = Arc::new(RecordingSleeper::new());
            let policy = RetryPolicy::builder()
                .attempts(4)
                .delay(Duration::from_millis(10))
                .backoff(3.0)
                .jitter(Duration::from_millis(5))
                .build()
                .unwrap();
            let retrying =
                Retrying::new(|_: &()| -> Result<(), String> { Err("x".into()) }, policy)
                    .with_sleeper(sleeper.clone())
                    .with_jitter(Arc::new(SeededJitter::new(7)));
            let _ = retrying.invoke(&());
            sleeper.recorded()
        };

        let first = run();
        assert_eq!(first, run());
        assert_eq!(first.len(), 3);
        for (i, wait) in first.iter().enumerate() {
            let base = Duration::from_millis(10 * 3_u64.pow(u32::try_from(i).unwrap()));
            assert!(*wait >= base && *wait <= base + Duration::from_millis(5));
        }
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig {
            attempts: 4,
            delay_ms: 250,
            backoff: 1.5,
            jitter_ms: 0,
        };
        let policy = RetryPolicy::<String>::from_config(&config).unwrap();
        assert_eq!(policy.attempts(), 4);
        assert_eq!(policy.delay_for(2, &no_jitter), Duration::from_millis(375));

        let bad = RetryConfig {
            attempts: 0,
            ..config
        };
        assert!(RetryPolicy::<String>::from_config(&bad).is_err());
    }

    #[tokio::test]
    async fn test_async_retry_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let sleeper = Arc::new(RecordingSleeper::new());
        let policy = RetryPolicy::builder()
            .attempts(3)
            .delay(Duration::from_secs(1))
            .backoff(2.0)
            .build()
            .unwrap();
        let retry = AsyncRetry::new(policy).with_sleeper(sleeper.clone());

        let result = retry
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err::<u32, String>(format!("transient {n}"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_retry_with_tokio_timer() {
        let policy = RetryPolicy::builder()
            .attempts(2)
            .delay(Duration::from_secs(10))
            .build()
            .unwrap();
        let retry = AsyncRetry::new(policy);
        let start = tokio::time::Instant::now();

        let result = retry
            .run(|| async { Err::<(), String>("down".to_string()) })
            .await;

        assert_eq!(result, Err("down".to_string()));
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[test]
    fn test_async_retry_exhaustion_blocking_runtime() {
        let reporter = Arc::new(RecordingReporter::new());
        let policy = RetryPolicy::builder().attempts(3).build().unwrap();
        let retry = AsyncRetry::new(policy)
            .with_sleeper(Arc::new(RecordingSleeper::new()))
            .with_reporter(reporter.clone());

        let result = tokio_test::block_on(retry.run(|| async { Err::<(), String>("e".into()) }));

        assert_eq!(result, Err("e".to_string()));
        assert_eq!(reporter.lines().len(), 3);
        assert!(reporter.contains("fail after 3 attempts"));
    }
}
