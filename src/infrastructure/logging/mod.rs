//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber, with optional
//! rolling file output through tracing-appender.

pub mod logger;

pub use logger::{parse_log_level, LoggerImpl};
