//! The three wrappers and their composition helpers.

pub mod cache;
pub mod compose;
pub mod retry;
pub mod timing;

pub use cache::{CacheStats, Cached, DeriveKey};
pub use compose::OperationExt;
pub use retry::{AsyncRetry, RetryDecision, RetryPolicy, RetryPolicyBuilder, Retrying};
pub use timing::Timed;
