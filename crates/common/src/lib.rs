//! OpenID Connect client primitives and session lifecycle for Portcullis.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: PKCE, token codec and validation, claims mapping,
//!   authorization predicates, configuration resolution, clock abstraction
//! - `runtime`: HTTP protocol client, session manager, expiry monitor
//!   (enabled by default)
//! - `test-utils`: mock client, recording navigator, mock clock and token
//!   fixtures for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod auth;
#[cfg(feature = "foundation")]
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use portcullis_domain::{AuthError, AuthResult, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use auth::{OidcClient, OidcClientTrait, RefreshOutcome, SessionManager};
#[cfg(feature = "foundation")]
pub use time::{Clock, SystemClock};
