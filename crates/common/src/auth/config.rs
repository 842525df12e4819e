//! Provider configuration resolution
//!
//! Two generations of variable names exist. The `OIDC_*` names supersede the
//! `OAUTH_*` names key by key; empty values count as absent. Resolution is a
//! pure function over a [`ConfigSource`] so it can be fed from the process
//! environment, a settings file or a test map.

use std::collections::{BTreeMap, HashMap};

use portcullis_domain::{AuthError, AuthResult, ProviderConfig};
use tracing::{debug, warn};
use url::Url;

/// Key/value lookup used for resolution
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

/// Reads straight from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A configurable setting and its variable names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    AuthorizationEndpoint,
    TokenEndpoint,
    UserinfoEndpoint,
    EndSessionEndpoint,
    RevocationEndpoint,
    Issuer,
    ClientId,
    RedirectUri,
    PostLogoutRedirectUri,
    Scope,
    RolesClaim,
    PermissionsClaim,
}

impl Setting {
    pub const ALL: [Self; 12] = [
        Self::AuthorizationEndpoint,
        Self::TokenEndpoint,
        Self::UserinfoEndpoint,
        Self::EndSessionEndpoint,
        Self::RevocationEndpoint,
        Self::Issuer,
        Self::ClientId,
        Self::RedirectUri,
        Self::PostLogoutRedirectUri,
        Self::Scope,
        Self::RolesClaim,
        Self::PermissionsClaim,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::AuthorizationEndpoint => "OIDC_AUTHORIZATION_ENDPOINT",
            Self::TokenEndpoint => "OIDC_TOKEN_ENDPOINT",
            Self::UserinfoEndpoint => "OIDC_USERINFO_ENDPOINT",
            Self::EndSessionEndpoint => "OIDC_END_SESSION_ENDPOINT",
            Self::RevocationEndpoint => "OIDC_REVOCATION_ENDPOINT",
            Self::Issuer => "OIDC_ISSUER",
            Self::ClientId => "OIDC_CLIENT_ID",
            Self::RedirectUri => "OIDC_REDIRECT_URI",
            Self::PostLogoutRedirectUri => "OIDC_POST_LOGOUT_REDIRECT_URI",
            Self::Scope => "OIDC_SCOPE",
            Self::RolesClaim => "OIDC_ROLES_CLAIM",
            Self::PermissionsClaim => "OIDC_PERMISSIONS_CLAIM",
        }
    }

    /// Name used by the older plain-OAuth configuration, if the setting had one
    #[must_use]
    pub const fn legacy_key(self) -> Option<&'static str> {
        match self {
            Self::AuthorizationEndpoint => Some("OAUTH_AUTHORIZATION_ENDPOINT"),
            Self::TokenEndpoint => Some("OAUTH_TOKEN_ENDPOINT"),
            Self::ClientId => Some("OAUTH_CLIENT_ID"),
            Self::RedirectUri => Some("OAUTH_REDIRECT_URI"),
            Self::PostLogoutRedirectUri => Some("OAUTH_POST_LOGOUT_URI"),
            Self::Scope => Some("OAUTH_SCOPE"),
            _ => None,
        }
    }
}

/// Emitted when the configuration still relies on legacy variable names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationNotice {
    /// Legacy keys whose values were used
    pub legacy_keys: Vec<&'static str>,
    pub message: String,
}

/// Result of [`resolve_config`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub config: ProviderConfig,
    pub deprecation: Option<DeprecationNotice>,
}

struct Lookup<'a, S: ConfigSource + ?Sized> {
    source: &'a S,
    legacy_used: Vec<&'static str>,
}

impl<S: ConfigSource + ?Sized> Lookup<'_, S> {
    fn non_empty(&self, key: &str) -> Option<String> {
        self.source.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn get(&mut self, setting: Setting) -> Option<String> {
        if let Some(value) = self.non_empty(setting.key()) {
            return Some(value);
        }
        let legacy = setting.legacy_key()?;
        let value = self.non_empty(legacy)?;
        self.legacy_used.push(legacy);
        Some(value)
    }

    fn required(&mut self, setting: Setting) -> AuthResult<String> {
        self.get(setting).ok_or_else(|| {
            AuthError::Config(format!("missing required setting {}", setting.key()))
        })
    }

    fn url(&mut self, setting: Setting) -> AuthResult<Option<Url>> {
        self.get(setting)
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    AuthError::Config(format!("{} is not a valid URL: {e}", setting.key()))
                })
            })
            .transpose()
    }

    fn required_url(&mut self, setting: Setting) -> AuthResult<Url> {
        self.url(setting)?.ok_or_else(|| {
            AuthError::Config(format!("missing required setting {}", setting.key()))
        })
    }
}

/// Resolve the provider configuration from `source`
///
/// # Errors
/// Returns [`AuthError::Config`] when a required setting is missing or an
/// endpoint is not a valid absolute URL.
pub fn resolve_config<S: ConfigSource + ?Sized>(source: &S) -> AuthResult<ResolvedConfig> {
    let mut lookup = Lookup { source, legacy_used: Vec::new() };

    let legacy_client_only = lookup.non_empty(Setting::ClientId.key()).is_none()
        && Setting::ClientId.legacy_key().and_then(|key| lookup.non_empty(key)).is_some();

    let mut config = ProviderConfig::new(
        lookup.required_url(Setting::AuthorizationEndpoint)?,
        lookup.required_url(Setting::TokenEndpoint)?,
        lookup.required(Setting::ClientId)?,
        lookup.required(Setting::RedirectUri)?,
    );

    config.userinfo_endpoint = lookup.url(Setting::UserinfoEndpoint)?;
    config.end_session_endpoint = lookup.url(Setting::EndSessionEndpoint)?;
    config.revocation_endpoint = lookup.url(Setting::RevocationEndpoint)?;
    config.issuer = lookup.get(Setting::Issuer);

    if let Some(uri) = lookup.get(Setting::PostLogoutRedirectUri) {
        config.post_logout_redirect_uri = uri;
    }
    if let Some(scope) = lookup.get(Setting::Scope) {
        config.scope = scope;
    }
    if let Some(path) = lookup.get(Setting::RolesClaim) {
        config.roles_claim = path;
    }
    if let Some(path) = lookup.get(Setting::PermissionsClaim) {
        config.permissions_claim = path;
    }

    let deprecation = legacy_client_only.then(|| {
        let notice = DeprecationNotice {
            message: format!(
                "Legacy OAUTH_* configuration in use ({}); migrate to the OIDC_* variables",
                lookup.legacy_used.join(", ")
            ),
            legacy_keys: lookup.legacy_used.clone(),
        };
        warn!(legacy_keys = ?notice.legacy_keys, "{}", notice.message);
        notice
    });

    debug!(
        client_id = %config.client_id,
        issuer = config.issuer.as_deref().unwrap_or("<unset>"),
        userinfo = config.userinfo_endpoint.is_some(),
        end_session = config.end_session_endpoint.is_some(),
        revocation = config.revocation_endpoint.is_some(),
        "resolved identity provider configuration"
    );

    Ok(ResolvedConfig { config, deprecation })
}
