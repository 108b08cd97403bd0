//! Infrastructure layer module
//!
//! This module contains the adapters behind the domain ports:
//! - Clocks (monotonic and manually driven)
//! - Sleepers (thread, tokio, recording)
//! - Reporters (tracing-backed, recording)
//! - Jitter sources (thread rng, seeded)
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod jitter;
pub mod logging;
pub mod reporter;
pub mod time;

pub use jitter::{SeededJitter, ThreadRngJitter};
pub use reporter::{RecordingReporter, TracingReporter};
pub use time::{ManualClock, MonotonicClock, RecordingSleeper, ThreadSleeper, TokioSleeper};
