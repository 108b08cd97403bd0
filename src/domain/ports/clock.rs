use std::time::Duration;

/// Source of timestamps for the timing and cache wrappers.
///
/// Timestamps are offsets from an arbitrary but fixed origin and must not
/// decrease between calls. Any `Fn() -> Duration` closure is a clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

impl<F> Clock for F
where
    F: Fn() -> Duration + Send + Sync,
{
    fn now(&self) -> Duration {
        self()
    }
}
