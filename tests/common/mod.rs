//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple integration
//! test files.

use std::sync::Arc;
use std::time::Duration;

use carapace::infrastructure::{ManualClock, RecordingReporter, RecordingSleeper};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Injected collaborators shared between a test and the wrappers under test.
#[allow(dead_code)]
pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub sleeper: Arc<RecordingSleeper>,
    pub reporter: Arc<RecordingReporter>,
}

#[allow(dead_code)]
impl Fixture {
    /// Clock starting at `start_secs`, recording sleeper and reporter.
    pub fn at(start_secs: u64) -> Self {
        Self {
            clock: Arc::new(ManualClock::new(Duration::from_secs(start_secs))),
            sleeper: Arc::new(RecordingSleeper::new()),
            reporter: Arc::new(RecordingReporter::new()),
        }
    }
}

/// Milliseconds as a `Duration`.
#[allow(dead_code)]
pub const fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}
