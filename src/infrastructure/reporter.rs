//! Reporter adapters.

use std::sync::{Mutex, PoisonError};

use crate::domain::ports::{Level, Reporter};

/// Forwards report lines into `tracing` at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct TracingReporter {
    level: Level,
}

impl TracingReporter {
    pub const fn new(level: Level) -> Self {
        Self { level }
    }

    pub const fn level(&self) -> Level {
        self.level
    }
}

impl Default for TracingReporter {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

impl Reporter for TracingReporter {
    fn report(&self, message: &str) {
        match self.level {
            Level::Trace => tracing::trace!(target: "carapace::report", "{message}"),
            Level::Debug => tracing::debug!(target: "carapace::report", "{message}"),
            Level::Info => tracing::info!(target: "carapace::report", "{message}"),
            Level::Warn => tracing::warn!(target: "carapace::report", "{message}"),
            Level::Error => tracing::error!(target: "carapace::report", "{message}"),
        }
    }
}

/// Keeps every report line in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True if any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|line| line.contains(needle))
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}
