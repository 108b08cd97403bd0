//! A memoized result and the moment it stops being valid.

use std::time::Duration;

/// One cached value. `expires_at` is `None` when the cache has no TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<R> {
    pub expires_at: Option<Duration>,
    pub value: R,
}

impl<R> CacheEntry<R> {
    /// Create an entry computed at `now`.
    pub fn new(value: R, now: Duration, ttl: Option<Duration>) -> Self {
        Self {
            expires_at: ttl.map(|ttl| now.saturating_add(ttl)),
            value,
        }
    }

    /// An entry is live strictly before its expiry.
    pub fn is_live(&self, now: Duration) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}
