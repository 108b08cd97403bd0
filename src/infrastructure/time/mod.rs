//! Clock and sleeper adapters.

pub mod clock;
pub mod sleeper;

pub use clock::{ManualClock, MonotonicClock};
pub use sleeper::{RecordingSleeper, ThreadSleeper, TokioSleeper};
