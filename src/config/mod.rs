//! Configuration model for docstore.
//!
//! This module defines the Config struct read from a YAML file passed with
//! `--config`. It supports forward-compatible YAML parsing (unknown fields are
//! ignored), defaults for every field, and validation of config values.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use types::ReloadPolicy;
