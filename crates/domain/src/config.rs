//! Identity provider configuration
//!
//! Loaded once at startup and read-only afterwards. Construction goes through
//! [`ProviderConfig::new`] with the required endpoints; optional endpoints and
//! overrides are chained.

use url::Url;

use crate::constants::{
    DEFAULT_PERMISSIONS_CLAIM, DEFAULT_POST_LOGOUT_REDIRECT, DEFAULT_ROLES_CLAIM, DEFAULT_SCOPE,
    OPENID_SCOPE,
};

/// OIDC provider and client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub userinfo_endpoint: Option<Url>,
    pub end_session_endpoint: Option<Url>,
    pub revocation_endpoint: Option<Url>,
    /// Expected `iss`; issuer validation is skipped when unset
    pub issuer: Option<String>,
    pub client_id: String,
    pub redirect_uri: String,
    /// Destination after logout (sent to the provider, or navigated to locally)
    pub post_logout_redirect_uri: String,
    /// Space-separated scopes as configured
    pub scope: String,
    /// Dotted claim path for roles, e.g. `realm_access.roles`
    pub roles_claim: String,
    pub permissions_claim: String,
}

impl ProviderConfig {
    /// Create a configuration with the required settings and defaults for the rest.
    #[must_use]
    pub fn new(
        authorization_endpoint: Url,
        token_endpoint: Url,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            authorization_endpoint,
            token_endpoint,
            userinfo_endpoint: None,
            end_session_endpoint: None,
            revocation_endpoint: None,
            issuer: None,
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            post_logout_redirect_uri: DEFAULT_POST_LOGOUT_REDIRECT.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            roles_claim: DEFAULT_ROLES_CLAIM.to_string(),
            permissions_claim: DEFAULT_PERMISSIONS_CLAIM.to_string(),
        }
    }

    #[must_use]
    pub fn with_userinfo_endpoint(mut self, url: Url) -> Self {
        self.userinfo_endpoint = Some(url);
        self
    }

    #[must_use]
    pub fn with_end_session_endpoint(mut self, url: Url) -> Self {
        self.end_session_endpoint = Some(url);
        self
    }

    #[must_use]
    pub fn with_revocation_endpoint(mut self, url: Url) -> Self {
        self.revocation_endpoint = Some(url);
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn with_post_logout_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.post_logout_redirect_uri = uri.into();
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn with_claim_paths(
        mut self,
        roles_claim: impl Into<String>,
        permissions_claim: impl Into<String>,
    ) -> Self {
        self.roles_claim = roles_claim.into();
        self.permissions_claim = permissions_claim.into();
        self
    }

    /// Scope sent with the authorization request; `openid` is prepended if absent.
    #[must_use]
    pub fn effective_scope(&self) -> String {
        let scopes: Vec<&str> = self.scope.split_whitespace().collect();
        if scopes.contains(&OPENID_SCOPE) {
            scopes.join(" ")
        } else {
            std::iter::once(OPENID_SCOPE).chain(scopes).collect::<Vec<_>>().join(" ")
        }
    }
}
