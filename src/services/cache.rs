//! TTL result cache with explicit invalidation.
//!
//! One table per wrapped operation, guarded by one mutex. The lock is only
//! held for table lookups, inserts and removals, never while the wrapped
//! operation runs. Expired entries are evicted lazily when read; nothing
//! sweeps the table in the background.
//!
//! Concurrent misses on the same key are not de-duplicated: every caller
//! that misses runs the operation, and the last insert wins.

use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

use crate::domain::errors::{CacheError, ConfigResult, KeyError};
use crate::domain::models::{CacheConfig, CacheEntry, InvocationKey};
use crate::domain::ports::{Clock, Operation};
use crate::infrastructure::MonotonicClock;

/// Default key function: [`InvocationKey::derive`].
pub type DeriveKey<A> = fn(&A) -> Result<InvocationKey, KeyError>;

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because they were found expired on read.
    pub expired: u64,
    /// Entries removed by `clear` or `invalidate`.
    pub invalidated: u64,
    /// Entries currently held, live or not.
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    invalidated: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

/// Operation wrapper that memoizes successful results per invocation key.
pub struct Cached<Op, A, K = DeriveKey<A>>
where
    A: ?Sized,
    Op: Operation<A>,
{
    inner: Op,
    key_fn: K,
    ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
    table: Mutex<HashMap<InvocationKey, CacheEntry<Op::Output>>>,
    counters: Counters,
    _args: PhantomData<fn(&A)>,
}

impl<Op, A> Cached<Op, A>
where
    A: Serialize + ?Sized,
    Op: Operation<A>,
{
    /// Cache keyed by [`InvocationKey::derive`]. `ttl = None` keeps
    /// entries until they are invalidated.
    pub fn new(inner: Op, ttl: Option<Duration>) -> Self {
        Self::with_key_fn(inner, ttl, InvocationKey::derive::<A>)
    }

    /// Build from configuration; a zero TTL is rejected here.
    pub fn from_config(inner: Op, config: &CacheConfig) -> ConfigResult<Self> {
        Ok(Self::new(inner, config.ttl()?))
    }
}

impl<Op, A, K> Cached<Op, A, K>
where
    A: ?Sized,
    Op: Operation<A>,
{
    /// Cache keyed by a caller-supplied key function.
    pub fn with_key_fn(inner: Op, ttl: Option<Duration>, key_fn: K) -> Self {
        Self {
            inner,
            key_fn,
            ttl,
            clock: Arc::new(MonotonicClock::new()),
            table: Mutex::new(HashMap::new()),
            counters: Counters::default(),
            _args: PhantomData,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub const fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub const fn inner(&self) -> &Op {
        &self.inner
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let removed = {
            let mut table = self.lock_table();
            let removed = table.len();
            table.clear();
            removed
        };
        Counters::bump(&self.counters.invalidated, removed as u64);
        debug!(removed, "cache cleared");
    }

    /// Remove every entry whose key satisfies `predicate`; returns how many
    /// were removed.
    ///
    /// The predicate runs while the table is locked, so it must not call
    /// back into this cache.
    pub fn invalidate<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&InvocationKey) -> bool,
    {
        let removed = {
            let mut table = self.lock_table();
            let before = table.len();
            table.retain(|key, _| !predicate(key));
            before - table.len()
        };
        Counters::bump(&self.counters.invalidated, removed as u64);
        debug!(removed, "cache entries invalidated");
        removed
    }

    /// Number of entries held, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.lock_table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_table().is_empty()
    }

    pub fn contains_key(&self, key: &InvocationKey) -> bool {
        self.lock_table().contains_key(key)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
            invalidated: self.counters.invalidated.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    // A panic while the lock is held cannot leave a half-written entry,
    // so a poisoned table is still consistent.
    fn lock_table(&self) -> MutexGuard<'_, HashMap<InvocationKey, CacheEntry<Op::Output>>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<Op, A, K> Operation<A> for Cached<Op, A, K>
where
    A: ?Sized,
    Op: Operation<A>,
    Op::Output: Clone,
    K: Fn(&A) -> Result<InvocationKey, KeyError>,
{
    type Output = Op::Output;
    type Error = CacheError<Op::Error>;

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn invoke(&self, args: &A) -> Result<Self::Output, Self::Error> {
        let key = (self.key_fn)(args).map_err(CacheError::Key)?;
        let now = self.clock.now();

        {
            let mut table = self.lock_table();
            if let Some(entry) = table.get(&key) {
                if entry.is_live(now) {
                    Counters::bump(&self.counters.hits, 1);
                    trace!(key = %key, "cache hit");
                    return Ok(entry.value.clone());
                }
                table.remove(&key);
                Counters::bump(&self.counters.expired, 1);
                trace!(key = %key, "cache entry expired");
            }
        }

        Counters::bump(&self.counters.misses, 1);
        trace!(key = %key, "cache miss");
        let value = self.inner.invoke(args).map_err(CacheError::Operation)?;

        self.lock_table()
            .insert(key, CacheEntry::new(value.clone(), now, self.ttl));
        Ok(value)
    }
}
