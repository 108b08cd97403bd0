//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides
//! - Validation against the wrapper constructors

pub mod loader;

pub use loader::ConfigLoader;
