//! Configuration loading
//!
//! Builds a [`callguard_domain::PipelineConfig`] from `CALLGUARD_*`
//! environment variables or from a TOML/JSON file.

pub mod loader;

// Re-export commonly used items
pub use loader::{discover_config_paths, load, load_from_env, load_from_file, parse_config};
