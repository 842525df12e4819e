//! # Portcullis Infrastructure
//!
//! Process-level plumbing for hosts of the identity client.
//!
//! This crate contains:
//! - Provider configuration loading (environment, `.env`, settings files)
//! - `tracing` subscriber installation
//!
//! ## Architecture
//! - Depends on `portcullis-common` for configuration resolution
//! - Contains the "impure" code (environment, filesystem, global subscriber)

pub mod config;
pub mod observability;

// Re-export commonly used items
pub use config::{load, load_from_env, load_from_file, probe_config_paths, ProviderSettings};
pub use observability::{init_tracing, LogFormat};
