//! Configuration for the execution server
//!
//! Provides the typed configuration tree and the loader that layers YAML files
//! and environment variables over the built-in defaults.

pub mod loader;
pub mod types;


pub use loader::ConfigLoader;
pub use types::{CodepadConfig, ExecutionSettings, ServerSettings, SessionSettings};
