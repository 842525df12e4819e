//! Provider configuration loader
//!
//! Resolves the identity provider configuration from environment variables
//! or a settings file. Both paths end in
//! [`resolve_config`](portcullis_common::auth::resolve_config), so precedence,
//! defaults and validation are identical.
//!
//! ## Loading Strategy
//! 1. Load `.env` (if present) and resolve from the process environment
//! 2. If required settings are missing, fall back to a settings file
//! 3. Probe well-known paths when no file is given
//! 4. Files may be JSON or TOML
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./portcullis.toml`, `./portcullis.json`, `./oidc.toml`, `./oidc.json`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};

use portcullis_common::auth::{resolve_config, ConfigSource, EnvSource, ResolvedConfig, Setting};
use portcullis_domain::{AuthError, AuthResult};
use serde::Deserialize;

const CONFIG_FILE_NAMES: [&str; 4] = ["portcullis.toml", "portcullis.json", "oidc.toml", "oidc.json"];

/// Provider settings as written in a settings file
///
/// Field names are the lower-case forms of the `OIDC_*` variables without
/// the prefix. Every field is optional here; required ones are enforced by
/// resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub userinfo_endpoint: Option<String>,
    pub end_session_endpoint: Option<String>,
    pub revocation_endpoint: Option<String>,
    pub issuer: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub post_logout_redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub roles_claim: Option<String>,
    pub permissions_claim: Option<String>,
}

impl ProviderSettings {
    fn value(&self, setting: Setting) -> Option<&String> {
        match setting {
            Setting::AuthorizationEndpoint => self.authorization_endpoint.as_ref(),
            Setting::TokenEndpoint => self.token_endpoint.as_ref(),
            Setting::UserinfoEndpoint => self.userinfo_endpoint.as_ref(),
            Setting::EndSessionEndpoint => self.end_session_endpoint.as_ref(),
            Setting::RevocationEndpoint => self.revocation_endpoint.as_ref(),
            Setting::Issuer => self.issuer.as_ref(),
            Setting::ClientId => self.client_id.as_ref(),
            Setting::RedirectUri => self.redirect_uri.as_ref(),
            Setting::PostLogoutRedirectUri => self.post_logout_redirect_uri.as_ref(),
            Setting::Scope => self.scope.as_ref(),
            Setting::RolesClaim => self.roles_claim.as_ref(),
            Setting::PermissionsClaim => self.permissions_claim.as_ref(),
        }
    }
}

impl ConfigSource for ProviderSettings {
    fn get(&self, key: &str) -> Option<String> {
        Setting::ALL
            .into_iter()
            .find(|setting| setting.key() == key)
            .and_then(|setting| self.value(setting))
            .cloned()
    }
}

/// Load configuration with automatic fallback strategy
///
/// First attempts the environment. If that fails, falls back to a settings
/// file found by [`probe_config_paths`].
///
/// # Errors
/// Returns `AuthError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> AuthResult<ResolvedConfig> {
    match load_from_env() {
        Ok(resolved) => {
            tracing::info!("Provider configuration loaded from environment variables");
            Ok(resolved)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// A `.env` file in the working directory (or its parents) is loaded first;
/// variables already set in the process take precedence over it.
///
/// # Errors
/// Returns `AuthError::Config` if required settings are missing or an
/// endpoint is not a valid URL.
pub fn load_from_env() -> AuthResult<ResolvedConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }
    resolve_config(&EnvSource)
}

/// Load configuration from a settings file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `AuthError::Config` if:
/// - File not found (when path is specified)
/// - No settings file found (when path is `None`)
/// - File format is invalid
/// - Required settings are missing
pub fn load_from_file(path: Option<PathBuf>) -> AuthResult<ResolvedConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AuthError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AuthError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading provider configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AuthError::Config(format!("Failed to read config file: {e}")))?;

    let settings = parse_settings(&contents, &config_path)?;
    resolve_config(&settings)
}

/// Parse settings by file extension (`.json` or `.toml`)
///
/// A file may hold the settings at the top level or under an `[oidc]`
/// table / `"oidc"` object.
fn parse_settings(contents: &str, path: &Path) -> AuthResult<ProviderSettings> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SettingsFile {
        Nested { oidc: ProviderSettings },
        Flat(ProviderSettings),
    }

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let file: SettingsFile = match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AuthError::Config(format!("Invalid TOML format: {e}")))?,
        "json" => serde_json::from_str(contents)
            .map_err(|e| AuthError::Config(format!("Invalid JSON format: {e}")))?,
        _ => return Err(AuthError::Config(format!("Unsupported config format: {extension}"))),
    };

    Ok(match file {
        SettingsFile::Nested { oidc } => oidc,
        SettingsFile::Flat(settings) => settings,
    })
}

/// Probe the standard locations for a settings file
///
/// # Returns
/// The first file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn all_keys() -> Vec<&'static str> {
        Setting::ALL
            .into_iter()
            .flat_map(|setting| std::iter::once(setting.key()).chain(setting.legacy_key()))
            .collect()
    }

    fn clear_env() {
        for key in all_keys() {
            std::env::remove_var(key);
        }
    }

    fn write_temp(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("OIDC_AUTHORIZATION_ENDPOINT", "https://idp.example.com/authorize");
        std::env::set_var("OIDC_TOKEN_ENDPOINT", "https://idp.example.com/token");
        std::env::set_var("OIDC_CLIENT_ID", "env-client");
        std::env::set_var("OIDC_REDIRECT_URI", "https://app.example.com/callback");
        std::env::set_var("OIDC_ROLES_CLAIM", "realm_access.roles");

        let result = load_from_env();
        assert!(result.is_ok(), "Should load config from env vars, error: {:?}", result.err());

        let resolved = result.unwrap();
        assert_eq!(resolved.config.client_id, "env-client");
        assert_eq!(resolved.config.roles_claim, "realm_access.roles");
        assert!(resolved.deprecation.is_none());

        clear_env();
    }

    #[test]
    fn test_load_from_env_legacy_names() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("OAUTH_AUTHORIZATION_ENDPOINT", "https://idp.example.com/authorize");
        std::env::set_var("OAUTH_TOKEN_ENDPOINT", "https://idp.example.com/token");
        std::env::set_var("OAUTH_CLIENT_ID", "legacy-client");
        std::env::set_var("OAUTH_REDIRECT_URI", "https://app.example.com/callback");

        let resolved = load_from_env().unwrap();
        assert_eq!(resolved.config.client_id, "legacy-client");
        assert!(resolved.deprecation.is_some(), "Legacy names should be flagged");

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("OIDC_AUTHORIZATION_ENDPOINT", "https://idp.example.com/authorize");

        let result = load_from_env();
        assert!(matches!(result, Err(AuthError::Config(_))), "Should be a Config error");

        clear_env();
    }

    #[test]
    fn test_load_from_file_json() {
        let path = write_temp(
            r#"{
                "authorization_endpoint": "https://idp.example.com/authorize",
                "token_endpoint": "https://idp.example.com/token",
                "revocation_endpoint": "https://idp.example.com/revoke",
                "client_id": "json-client",
                "redirect_uri": "https://app.example.com/callback"
            }"#,
            "json",
        );

        let resolved = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(resolved.config.client_id, "json-client");
        assert!(resolved.config.revocation_endpoint.is_some());
        assert!(resolved.config.userinfo_endpoint.is_none());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_toml_nested() {
        let path = write_temp(
            r#"
[oidc]
authorization_endpoint = "https://idp.example.com/authorize"
token_endpoint = "https://idp.example.com/token"
client_id = "toml-client"
redirect_uri = "https://app.example.com/callback"
scope = "profile"
"#,
            "toml",
        );

        let resolved = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(resolved.config.client_id, "toml-client");
        assert_eq!(resolved.config.effective_scope(), "openid profile");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_missing_required() {
        let path = write_temp(r#"client_id = "toml-client""#, "toml");

        let result = load_from_file(Some(path.clone()));
        assert!(matches!(result, Err(AuthError::Config(_))));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/portcullis.json")));
        assert!(matches!(result, Err(AuthError::Config(_))), "Should be a Config error");
    }

    #[test]
    fn test_parse_settings_invalid_json() {
        let result = parse_settings(r#"{ "client_id": "x" "#, Path::new("portcullis.json"));
        assert!(result.is_err(), "Should fail with invalid JSON");
    }

    #[test]
    fn test_parse_settings_unsupported_format() {
        let result = parse_settings("client_id: x", Path::new("portcullis.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn test_settings_source_ignores_legacy_keys() {
        let settings =
            ProviderSettings { client_id: Some("file-client".to_string()), ..Default::default() };

        assert_eq!(settings.get("OIDC_CLIENT_ID").as_deref(), Some("file-client"));
        assert_eq!(settings.get("OAUTH_CLIENT_ID"), None);
        assert_eq!(settings.get("OIDC_SCOPE"), None);
    }
}
