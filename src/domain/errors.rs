//! Domain errors for the carapace wrappers.
//!
//! Three kinds of failure exist: configuration errors raised while a
//! wrapper is being built, key-derivation errors raised by the cache at
//! call time, and the wrapped operation's own failures, which are passed
//! through untouched.

use std::fmt;
use thiserror::Error;

/// Errors raised while constructing a wrapper, before any operation runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid time unit: {0:?}. Must be one of: s, ms, us")]
    InvalidTimeUnit(String),

    #[error("Invalid attempts: {0}. Must be at least 1")]
    InvalidAttempts(u32),

    #[error("Invalid backoff multiplier: {0}. Must be finite and non-negative")]
    InvalidBackoff(f64),

    #[error("Invalid ttl: {0}")]
    InvalidTtl(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Failure to turn call arguments into an [`InvocationKey`].
///
/// [`InvocationKey`]: crate::domain::models::InvocationKey
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("argument {argument} cannot be used as a cache key: {source}")]
    Unserializable {
        argument: String,
        #[source]
        source: KeyValueError,
    },

    #[error("arguments rejected by key function: {0}")]
    Rejected(String),
}

impl KeyError {
    /// Build a rejection from a caller-supplied key function.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// A value the key serializer cannot represent, such as a map with
/// non-string keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct KeyValueError(String);

impl KeyValueError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl serde::ser::Error for KeyValueError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// Error returned by a cached operation.
///
/// `Key` can only come from the cache wrapper itself; `Operation` carries
/// the wrapped operation's failure unchanged.
#[derive(Debug, Error)]
pub enum CacheError<E> {
    #[error("cannot cache non-hashable arguments: {0}")]
    Key(#[source] KeyError),

    #[error("{0}")]
    Operation(E),
}

impl<E> CacheError<E> {
    pub const fn is_key_error(&self) -> bool {
        matches!(self, Self::Key(_))
    }

    /// The underlying operation's failure, if this is one.
    pub const fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Key(_) => None,
        }
    }

    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Key(_) => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
