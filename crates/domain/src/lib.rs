//! # Portcullis Domain
//!
//! Data model for the Portcullis identity client.
//!
//! This crate contains:
//! - Identity claims, user profile, session and token wire types
//! - The `AuthError` taxonomy and `AuthResult` alias
//! - Provider configuration
//! - Protocol constants (storage keys, buffers, defaults)
//!
//! ## Architecture
//! - No dependencies on other Portcullis crates
//! - No I/O; pure data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::ProviderConfig;
pub use errors::*;
pub use types::*;
