//! Retry wrapper behavior with injected sleeper, reporter and jitter.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use carapace::infrastructure::{RecordingReporter, RecordingSleeper, SeededJitter};
use carapace::services::{AsyncRetry, RetryPolicy, Retrying};
use carapace::{ConfigError, Operation, RetryConfig};
use common::{ms, Fixture};

#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchError {
    Timeout,
    NotFound,
}

/// Fails with `error` for the first `failures` invocations.
fn failing_then_ok(
    failures: u32,
    error: FetchError,
    calls: &AtomicU32,
) -> impl Fn(&u32) -> Result<String, FetchError> + '_ {
    move |id: &u32| {
        if calls.fetch_add(1, Ordering::SeqCst) < failures {
            Err(error.clone())
        } else {
            Ok(format!("record-{id}"))
        }
    }
}

#[test]
fn test_succeeds_on_third_attempt_with_backoff() {
    common::setup_test_logging();
    let fx = Fixture::at(0);
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::builder()
        .attempts(3)
        .delay(ms(100))
        .backoff(2.0)
        .build()
        .unwrap();

    let fetch = Retrying::new(failing_then_ok(2, FetchError::Timeout, &calls), policy)
        .with_sleeper(fx.sleeper.clone())
        .with_reporter(fx.reporter.clone())
        .with_jitter(Arc::new(|| 0.0_f64));

    assert_eq!(fetch.invoke(&7).unwrap(), "record-7");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(fx.sleeper.recorded(), vec![ms(100), ms(200)]);
    assert_eq!(
        fx.reporter.lines(),
        vec![
            "[retries] attempt 1 failed: Timeout; sleeping 0.100s",
            "[retries] attempt 2 failed: Timeout; sleeping 0.200s",
        ]
    );
}

#[test]
fn test_exhaustion_returns_last_error() {
    let fx = Fixture::at(0);
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::builder()
        .attempts(3)
        .delay(ms(10))
        .build()
        .unwrap();

    let fetch = Retrying::new(failing_then_ok(u32::MAX, FetchError::Timeout, &calls), policy)
        .with_sleeper(fx.sleeper.clone())
        .with_reporter(fx.reporter.clone());

    assert_eq!(fetch.invoke(&1), Err(FetchError::Timeout));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(fx.sleeper.recorded().len(), 2, "no sleep after the last attempt");
    assert_eq!(
        fx.reporter.lines().last().map(String::as_str),
        Some("[retries] fail after 3 attempts: Timeout")
    );
}

#[test]
fn test_single_attempt_never_sleeps() {
    let fx = Fixture::at(0);
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::builder()
        .attempts(1)
        .delay(Duration::from_secs(60))
        .build()
        .unwrap();

    let fetch = Retrying::new(failing_then_ok(1, FetchError::Timeout, &calls), policy)
        .with_sleeper(fx.sleeper.clone())
        .with_reporter(fx.reporter.clone());

    assert_eq!(fetch.invoke(&1), Err(FetchError::Timeout));
    assert!(fx.sleeper.recorded().is_empty());
    assert_eq!(fx.reporter.lines(), vec!["[retries] fail after 1 attempts: Timeout"]);
}

#[test]
fn test_non_retryable_error_propagates_immediately() {
    let fx = Fixture::at(0);
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::builder()
        .attempts(5)
        .retry_if(|e: &FetchError| *e == FetchError::Timeout)
        .build()
        .unwrap();

    let fetch = Retrying::new(failing_then_ok(3, FetchError::NotFound, &calls), policy)
        .with_sleeper(fx.sleeper.clone())
        .with_reporter(fx.reporter.clone());

    assert_eq!(fetch.invoke(&1), Err(FetchError::NotFound));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(fx.sleeper.recorded().is_empty());
    assert!(fx.reporter.lines().is_empty());
}

#[test]
fn test_jitter_stays_within_bound() {
    let sleeper = Arc::new(RecordingSleeper::new());
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::builder()
        .attempts(6)
        .delay(ms(10))
        .backoff(1.0)
        .jitter(ms(5))
        .build()
        .unwrap();

    let fetch = Retrying::new(failing_then_ok(5, FetchError::Timeout, &calls), policy)
        .with_sleeper(sleeper.clone())
        .with_reporter(Arc::new(RecordingReporter::new()))
        .with_jitter(Arc::new(SeededJitter::new(42)));

    fetch.invoke(&1).unwrap();
    let waits = sleeper.recorded();
    assert_eq!(waits.len(), 5);
    assert!(waits.iter().all(|w| *w >= ms(10) && *w <= ms(15)));
}

#[test]
fn test_policy_from_config() {
    let config = RetryConfig {
        attempts: 4,
        delay_ms: 50,
        backoff: 3.0,
        jitter_ms: 0,
    };
    let policy: RetryPolicy<FetchError> = RetryPolicy::from_config(&config).unwrap();
    let zero = || 0.0_f64;
    assert_eq!(policy.delay_for(1, &zero), ms(50));
    assert_eq!(policy.delay_for(3, &zero), ms(450));

    let bad = RetryConfig {
        attempts: 0,
        ..config
    };
    assert_eq!(
        RetryPolicy::<FetchError>::from_config(&bad).unwrap_err(),
        ConfigError::InvalidAttempts(0)
    );
}

#[tokio::test(start_paused = true)]
async fn test_async_retry_suspends_on_tokio_timer() {
    let calls = AtomicU32::new(0);
    let reporter = Arc::new(RecordingReporter::new());
    let policy = RetryPolicy::builder()
        .attempts(3)
        .delay(ms(250))
        .backoff(2.0)
        .build()
        .unwrap();
    let retry = AsyncRetry::new(policy)
        .with_reporter(reporter.clone())
        .with_jitter(Arc::new(|| 0.0_f64));

    let calls = &calls;
    let started = tokio::time::Instant::now();
    let value = retry
        .run(|| async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(FetchError::Timeout)
            } else {
                Ok(99)
            }
        })
        .await
        .unwrap();

    assert_eq!(value, 99);
    let elapsed = started.elapsed();
    assert!(elapsed >= ms(750) && elapsed < ms(760), "elapsed {elapsed:?}");
    assert_eq!(reporter.lines().len(), 2);
}

#[tokio::test]
async fn test_async_retry_exhaustion_with_recording_sleeper() {
    let sleeper = Arc::new(RecordingSleeper::new());
    let policy = RetryPolicy::builder()
        .attempts(2)
        .delay(ms(5))
        .build()
        .unwrap();
    let retry = AsyncRetry::new(policy)
        .with_sleeper(sleeper.clone())
        .with_reporter(Arc::new(RecordingReporter::new()));

    let result: Result<(), FetchError> = retry.run(|| async { Err(FetchError::Timeout) }).await;

    assert_eq!(result, Err(FetchError::Timeout));
    assert_eq!(sleeper.recorded(), vec![ms(5)]);
}
