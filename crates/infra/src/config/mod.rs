//! Provider configuration loading
//!
//! Loads the identity provider configuration from environment variables and
//! settings files.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths, ProviderSettings};
