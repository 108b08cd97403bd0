//! Method-chaining for wrapper composition.
//!
//! Each adapter consumes an operation and returns a wrapper that is again
//! an [`Operation`] over the same arguments, so wrappers stack in any
//! order:
//!
//! ```
//! use carapace::services::{OperationExt, RetryPolicy};
//! use carapace::domain::models::TimeUnit;
//! use carapace::domain::ports::Operation;
//!
//! let lookup = |id: &u32| -> Result<String, String> { Ok(format!("user-{id}")) };
//! let policy = RetryPolicy::builder().attempts(3).build().unwrap();
//!
//! let wrapped = lookup
//!     .retrying(policy)
//!     .cached(None)
//!     .timed(TimeUnit::Microseconds);
//!
//! assert_eq!(wrapped.invoke(&7).unwrap(), "user-7");
//! assert_eq!(wrapped.inner().len(), 1);
//! ```

use serde::Serialize;
use std::time::Duration;

use crate::domain::errors::KeyError;
use crate::domain::models::{InvocationKey, TimeUnit};
use crate::domain::ports::Operation;
use crate::services::cache::Cached;
use crate::services::retry::{RetryPolicy, Retrying};
use crate::services::timing::Timed;

pub trait OperationExt<A: ?Sized>: Operation<A> + Sized {
    fn timed(self, unit: TimeUnit) -> Timed<Self> {
        Timed::new(self, unit)
    }

    fn retrying(self, policy: RetryPolicy<Self::Error>) -> Retrying<Self, Self::Error> {
        Retrying::new(self, policy)
    }

    fn cached(self, ttl: Option<Duration>) -> Cached<Self, A>
    where
        A: Serialize,
    {
        Cached::new(self, ttl)
    }

    fn cached_by<K>(self, ttl: Option<Duration>, key_fn: K) -> Cached<Self, A, K>
    where
        K: Fn(&A) -> Result<InvocationKey, KeyError>,
    {
        Cached::with_key_fn(self, ttl, key_fn)
    }
}

impl<A: ?Sized, T: Operation<A>> OperationExt<A> for T {}
