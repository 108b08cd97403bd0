//! Domain layer for carapace
//!
//! Invocation keys, cache entries, configuration models and the port
//! traits through which wrappers reach clocks, sleepers, reporters and
//! random sources.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{CacheError, ConfigError, ConfigResult, KeyError};
