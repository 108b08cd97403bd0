//! Latency instrumentation wrapper.
//!
//! Every call is measured with the injected clock and produces exactly one
//! report line, including calls that fail or panic. The wrapped operation's
//! result is returned untouched.

use std::sync::Arc;

use crate::domain::errors::ConfigResult;
use crate::domain::models::{TimeUnit, TimingConfig};
use crate::domain::ports::{Clock, Operation, Reporter};
use crate::infrastructure::{MonotonicClock, TracingReporter};

/// Operation wrapper that reports how long each call took.
///
/// Without an explicit label the report names the wrapped operation, see
/// [`Operation::name`].
pub struct Timed<Op> {
    inner: Op,
    label: Option<String>,
    unit: TimeUnit,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn Reporter>,
}

impl<Op> Timed<Op> {
    /// Wrap `inner` with the production clock and a `tracing` reporter.
    pub fn new(inner: Op, unit: TimeUnit) -> Self {
        Self {
            inner,
            label: None,
            unit,
            clock: Arc::new(MonotonicClock::new()),
            reporter: Arc::new(TracingReporter::default()),
        }
    }

    /// Build from configuration. An unknown unit fails here, before any
    /// call is made.
    pub fn from_config(inner: Op, config: &TimingConfig) -> ConfigResult<Self> {
        let mut timed = Self::new(inner, config.time_unit()?);
        timed.label.clone_from(&config.label);
        Ok(timed)
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// The explicit label, if one was set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub const fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub const fn inner(&self) -> &Op {
        &self.inner
    }
}

impl<A, Op> Operation<A> for Timed<Op>
where
    A: ?Sized,
    Op: Operation<A>,
{
    type Output = Op::Output;
    type Error = Op::Error;

    fn invoke(&self, args: &A) -> Result<Self::Output, Self::Error> {
        let _report = ElapsedReport {
            timed: self,
            label: self.label.as_deref().unwrap_or_else(|| self.inner.name()),
            started: self.clock.now(),
        };
        self.inner.invoke(args)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Emits the report line when dropped, so unwinding calls are reported too.
struct ElapsedReport<'a, Op> {
    timed: &'a Timed<Op>,
    label: &'a str,
    started: std::time::Duration,
}

impl<Op> Drop for ElapsedReport<'_, Op> {
    fn drop(&mut self) {
        let elapsed = self.timed.clock.now().saturating_sub(self.started);
        self.timed.reporter.report(&format!(
            "[timed] {} took {:.3} {}",
            self.label,
            self.timed.unit.scale(elapsed),
            self.timed.unit
        ));
    }
}
