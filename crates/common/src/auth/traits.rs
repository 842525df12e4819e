//! Seams between the session manager and its environment
//!
//! These traits let the session manager run against a real provider and a
//! browser-like host in production, and against mocks in tests.

use async_trait::async_trait;
use portcullis_domain::{AuthResult, ProviderConfig, TokenResponse};
use serde_json::{Map, Value};
use url::Url;

use super::client::{build_authorization_url, build_end_session_url};

/// Protocol operations against the identity provider
///
/// URL construction has default implementations over [`Self::config`]; only
/// the network calls must be provided.
#[async_trait]
pub trait OidcClientTrait: Send + Sync {
    /// Provider configuration this client was built with
    fn config(&self) -> &ProviderConfig;

    /// Authorization request URL for the given PKCE challenge and state
    ///
    /// # Errors
    /// Returns error if the configured endpoint cannot carry a query string
    fn authorization_url(&self, challenge: &str, state: &str) -> AuthResult<Url> {
        build_authorization_url(self.config(), challenge, state)
    }

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    /// Returns `TokenExchangeFailed` with the provider's error code, or
    /// `network_error` when the request could not be sent
    async fn exchange_code(&self, code: &str, verifier: &str) -> AuthResult<TokenResponse>;

    /// Refresh-token grant
    ///
    /// # Errors
    /// Returns `RefreshFailed` for any transport, protocol or parse failure
    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenResponse>;

    /// Best-effort revocation of the access token and, if given, the refresh
    /// token. Failures are logged and never returned.
    async fn revoke(&self, access_token: &str, refresh_token: Option<&str>);

    /// Provider logout URL, or `None` when no end-session endpoint is configured
    fn end_session_url(&self, id_token: &str) -> Option<Url> {
        build_end_session_url(self.config(), id_token)
    }

    /// Fetch the UserInfo document
    ///
    /// # Errors
    /// Returns `UserInfoUnavailable` when no endpoint is configured or the
    /// request fails; callers degrade to identity-token claims.
    async fn fetch_userinfo(&self, access_token: &str) -> AuthResult<Map<String, Value>>;
}

/// Tab-scoped key/value storage that survives the authorization redirect
pub trait EphemeralStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    /// Returns `Storage` if the backing store rejects the write
    fn set(&self, key: &str, value: &str) -> AuthResult<()>;

    fn remove(&self, key: &str);
}

/// Full-page navigation (authorization redirect, logout)
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}
