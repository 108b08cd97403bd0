//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces the wrappers depend on:
//! - Operation: the wrapped unit of work
//! - Clock: timestamps for timing and expiry
//! - Sleeper / AsyncSleeper: pauses between retry attempts
//! - Reporter: sink for report lines
//! - JitterSource: randomness for retry delays
//!
//! Production and test implementations live in `infrastructure`.

pub mod clock;
pub mod jitter;
pub mod operation;
pub mod reporter;
pub mod sleeper;

pub use clock::Clock;
pub use jitter::JitterSource;
pub use operation::Operation;
pub use reporter::{Level, Reporter};
pub use sleeper::{AsyncSleeper, Sleeper};
