//! Configuration module.
//!
//! This module provides the prober settings and the functionality for
//! loading them from JSON files.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::AppConfig;
