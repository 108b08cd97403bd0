//! Implementation of the `carapace demo` command.
//!
//! Computes `x * k` through an operation that fails its first
//! `--fail-times` invocations, wrapped as retry inside cache inside timing,
//! all built from the loaded configuration.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::domain::ports::Operation;
use crate::services::{CacheStats, Cached, RetryPolicy, Retrying, Timed};

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    /// Number of invocations that fail before the operation recovers
    #[arg(long, default_value_t = 2)]
    pub fail_times: u32,

    /// Number of calls made through the wrapped operation
    #[arg(long, default_value_t = 3)]
    pub calls: u32,

    /// First factor
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    pub x: i64,

    /// Second factor, passed by name
    #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
    pub k: i64,
}

/// Arguments of the demo operation; serialized as named key parts.
#[derive(Debug, Serialize)]
struct Product {
    x: i64,
    k: i64,
}

#[derive(Debug, Serialize)]
pub struct CallOutcome {
    pub call: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DemoOutput {
    pub x: i64,
    pub k: i64,
    pub outcomes: Vec<CallOutcome>,
    pub invocations: u32,
    pub cache: CacheStats,
}

impl CommandOutput for DemoOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("x * k with x={} k={}", self.x, self.k)];
        for outcome in &self.outcomes {
            match (&outcome.value, &outcome.error) {
                (Some(value), _) => lines.push(format!("  call {}: {value}", outcome.call)),
                (None, Some(error)) => {
                    lines.push(format!("  call {}: failed: {error}", outcome.call));
                }
                (None, None) => {}
            }
        }
        lines.push(format!(
            "underlying invocations: {}; cache hits={} misses={} entries={}",
            self.invocations, self.cache.hits, self.cache.misses, self.cache.entries
        ));
        lines.join("\n")
    }
}

pub async fn execute(args: DemoArgs, config: Config, json_mode: bool) -> Result<()> {
    // The wrappers sleep on the calling thread between attempts.
    let result = tokio::task::spawn_blocking(move || run(&args, &config))
        .await
        .context("Demo task did not complete")??;

    output(&result, json_mode);
    Ok(())
}

fn run(args: &DemoArgs, config: &Config) -> Result<DemoOutput> {
    let invocations = AtomicU32::new(0);
    let failures_left = AtomicU32::new(args.fail_times);

    let flaky = |p: &Product| -> Result<i64, String> {
        let n = invocations.fetch_add(1, Ordering::SeqCst) + 1;
        if failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
        {
            return Err(format!("transient failure on invocation {n}"));
        }
        p.x.checked_mul(p.k)
            .ok_or_else(|| format!("{} * {} overflows", p.x, p.k))
    };

    let policy: RetryPolicy<String> = RetryPolicy::from_config(&config.retry)?;
    let cached = Cached::<_, Product>::from_config(Retrying::new(flaky, policy), &config.cache)?;
    let mut timed = Timed::from_config(cached, &config.timing)?;
    if config.timing.label.is_none() {
        timed = timed.with_label("x*k");
    }

    let product = Product { x: args.x, k: args.k };
    let outcomes = (1..=args.calls)
        .map(|call| match timed.invoke(&product) {
            Ok(value) => CallOutcome {
                call,
                value: Some(value),
                error: None,
            },
            Err(err) => CallOutcome {
                call,
                value: None,
                error: Some(err.to_string()),
            },
        })
        .collect();

    let cache = timed.inner().stats();
    Ok(DemoOutput {
        x: args.x,
        k: args.k,
        outcomes,
        invocations: invocations.load(Ordering::SeqCst),
        cache,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(fail_times: u32, calls: u32) -> DemoArgs {
        DemoArgs {
            fail_times,
            calls,
            x: 10,
            k: 2,
        }
    }

    #[test]
    fn test_recovers_then_serves_from_cache() {
        let out = run(&args(2, 3), &Config::default()).unwrap();

        assert!(out.outcomes.iter().all(|o| o.value == Some(20)));
        assert_eq!(out.invocations, 3, "two failures and one success");
        assert_eq!(out.cache.misses, 1);
        assert_eq!(out.cache.hits, 2);
        assert_eq!(out.cache.entries, 1);
    }

    #[test]
    fn test_exhausted_call_is_not_cached() {
        // Three attempts per call: the first call exhausts them, the second
        // fails twice more and then succeeds.
        let out = run(&args(5, 3), &Config::default()).unwrap();

        assert_eq!(out.outcomes[0].value, None);
        assert_eq!(
            out.outcomes[0].error.as_deref(),
            Some("transient failure on invocation 3")
        );
        assert_eq!(out.outcomes[1].value, Some(20));
        assert_eq!(out.outcomes[2].value, Some(20));
        assert_eq!(out.invocations, 6);
        assert_eq!(out.cache.misses, 2);
        assert_eq!(out.cache.hits, 1);
    }

    #[test]
    fn test_invalid_config_fails_before_any_call() {
        let mut config = Config::default();
        config.timing.unit = "minutes".to_string();

        let err = run(&args(0, 1), &config).unwrap_err();
        assert!(err.to_string().contains("Invalid time unit"));
    }

    #[test]
    fn test_human_output() {
        let out = run(&args(0, 2), &Config::default()).unwrap();
        let text = out.to_human();
        assert!(text.contains("call 1: 20"));
        assert!(text.contains("underlying invocations: 1; cache hits=1 misses=1 entries=1"));
    }
}
