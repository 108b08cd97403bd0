use async_trait::async_trait;
use std::time::Duration;

/// Blocking pause between retry attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

impl<F> Sleeper for F
where
    F: Fn(Duration) + Send + Sync,
{
    fn sleep(&self, duration: Duration) {
        self(duration);
    }
}

/// Suspending pause for the async retry driver.
#[async_trait]
pub trait AsyncSleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
