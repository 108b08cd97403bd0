//! Carapace - resilience wrappers for fallible operations
//!
//! Carapace wraps any fallible operation with one or more cross-cutting
//! behaviors without changing what the operation computes:
//!
//! - **Timing** ([`Timed`]): one latency report per call, in s, ms or us
//! - **Retry** ([`Retrying`], [`AsyncRetry`]): bounded attempts with
//!   exponential backoff and uniform jitter
//! - **TTL cache** ([`Cached`]): memoized results keyed by the call's
//!   arguments, with thread-safe `clear` and predicate `invalidate`
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): keys, cache entries, config models and port traits
//! - **Service Layer** (`services`): the wrappers themselves
//! - **Infrastructure Layer** (`infrastructure`): clocks, sleepers, reporters,
//!   jitter sources, configuration loading and logging
//! - **CLI Layer** (`cli`): the `carapace` command-line interface
//!
//! # Example
//!
//! ```
//! use carapace::{OperationExt, Operation, RetryPolicy, TimeUnit};
//!
//! let policy = RetryPolicy::builder().attempts(2).build().unwrap();
//! let square = |x: &i64| -> Result<i64, String> { Ok(x * x) };
//! let wrapped = square.retrying(policy).cached(None).timed(TimeUnit::Milliseconds);
//!
//! assert_eq!(wrapped.invoke(&12).unwrap(), 144);
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{CacheError, ConfigError, ConfigResult, KeyError, KeyValueError};
pub use domain::models::{
    CacheConfig, Config, InvocationKey, KeyPart, LoggingConfig, RetryConfig, TimeUnit,
    TimingConfig,
};
pub use domain::ports::{AsyncSleeper, Clock, JitterSource, Operation, Reporter, Sleeper};
pub use infrastructure::config::ConfigLoader;
pub use services::{
    AsyncRetry, CacheStats, Cached, OperationExt, RetryDecision, RetryPolicy, Retrying, Timed,
};
