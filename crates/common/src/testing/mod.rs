//! Testing utilities and helpers
//!
//! This module provides:
//! - **[`fixtures`]**: provider config, identity claims and unsigned tokens
//! - **[`mocks`]**: mock OIDC client, recording navigator, failing storage
//! - **[`time`]**: controllable wall clock
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use portcullis_common::auth::SessionManager;
//! use portcullis_common::testing::{fixtures, MockClock, MockOidcClient, RecordingNavigator};
//!
//! let config = fixtures::provider_config("https://idp.example.com");
//! let client = Arc::new(MockOidcClient::new(config));
//! let navigator = Arc::new(RecordingNavigator::new());
//! let manager = SessionManager::builder(client, navigator.clone())
//!     .clock(Arc::new(MockClock::at_unix(1_800_000_000)))
//!     .build();
//!
//! manager.login().unwrap();
//! assert_eq!(navigator.count(), 1);
//! ```

pub mod fixtures;
pub mod mocks;
pub mod time;

pub use mocks::{FailingStorage, MockOidcClient, RecordingNavigator, RevocationCall};
pub use time::MockClock;
