//! OpenID Connect authorization code flow with PKCE
//!
//! Client side of an OIDC login for public clients: PKCE generation, the
//! authorization and token requests, identity token decoding and validation,
//! claims-to-profile mapping, refresh monitoring and logout.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  SessionManager  │  Owns the Session, state machine, subscribers
//! └────────┬─────────┘
//!          │
//!          ├──► OidcClientTrait     (token / refresh / revoke / userinfo)
//!          ├──► token, claims       (decode, validate, build profile)
//!          ├──► EphemeralStorage    (verifier, state, return path)
//!          ├──► Navigator           (full-page redirects)
//!          └──► monitor             (periodic expiry check)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use portcullis_common::auth::{
//!     resolve_config, EnvSource, Navigator, OidcClient, SessionManager,
//! };
//!
//! struct Browser;
//!
//! impl Navigator for Browser {
//!     fn navigate(&self, url: &str) {
//!         println!("open {url}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolved = resolve_config(&EnvSource)?;
//!     let client = Arc::new(OidcClient::new(resolved.config));
//!     let manager = SessionManager::builder(client, Arc::new(Browser)).build();
//!
//!     manager.login()?;
//!
//!     // ... the provider redirects back to the configured redirect URI ...
//!     let callback = url::Url::parse("https://app.example.com/callback?code=abc&state=xyz")?;
//!     let profile = manager.handle_redirect(&callback).await?;
//!     println!("signed in as {}", profile.name);
//!
//!     manager.logout().await;
//!     Ok(())
//! }
//! ```

pub mod claims;
#[cfg(feature = "runtime")]
pub mod client;
pub mod config;
pub mod permissions;
pub mod pkce;
pub mod token;

#[cfg(feature = "runtime")]
pub mod monitor;
#[cfg(feature = "runtime")]
pub mod session;
#[cfg(feature = "runtime")]
pub mod storage;
#[cfg(feature = "runtime")]
pub mod traits;

pub use claims::{build_profile, extract_list, merge_claims, resolve_path};
pub use config::{
    resolve_config, ConfigSource, DeprecationNotice, EnvSource, ResolvedConfig, Setting,
};
pub use permissions::{check_access, AccessDecision, Permissions, RouteRequirement};
pub use pkce::{generate_challenge_pair, generate_state, validate_state, ChallengePair};
pub use token::{
    decode, encode_unsigned, is_expired, is_token_expired, validate, validate_token_structure,
};

#[cfg(feature = "runtime")]
pub use client::{build_authorization_url, build_end_session_url, OidcClient};
#[cfg(feature = "runtime")]
pub use monitor::MonitorHandle;
#[cfg(feature = "runtime")]
pub use session::{RefreshOutcome, SessionManager, SessionManagerBuilder};
#[cfg(feature = "runtime")]
pub use storage::MemoryStorage;
#[cfg(feature = "runtime")]
pub use traits::{EphemeralStorage, Navigator, OidcClientTrait};
