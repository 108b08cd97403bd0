pub mod cache_entry;
pub mod config;
pub mod key;
mod key_serializer;
pub mod time_unit;

pub use cache_entry::CacheEntry;
pub use config::{CacheConfig, Config, LoggingConfig, RetryConfig, RotationPolicy, TimingConfig};
pub use key::{InvocationKey, InvocationKeyBuilder, KeyPart};
pub use time_unit::TimeUnit;
