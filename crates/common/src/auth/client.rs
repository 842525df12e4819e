//! OIDC protocol client
//!
//! Builds the authorization and end-session URLs and performs the token,
//! refresh, revocation and UserInfo requests against the provider. The HTTP
//! client is built once per instance with a fixed timeout.
//!
//! Token values are never logged.

use std::time::Duration;

use async_trait::async_trait;
use portcullis_domain::constants::{CODE_CHALLENGE_METHOD, DEFAULT_HTTP_TIMEOUT_SECS};
use portcullis_domain::{
    AuthError, AuthResult, OAuthErrorResponse, ProviderConfig, TokenResponse, TokenTypeHint,
};
use reqwest::{Client, Response};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use super::traits::OidcClientTrait;

/// Error code reported when the token endpoint could not be reached
pub const NETWORK_ERROR_CODE: &str = "network_error";

fn append_query(endpoint: &Url, params: &[(&str, &str)]) -> Url {
    let encoded = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let mut url = endpoint.clone();
    let query = match endpoint.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
        _ => encoded,
    };
    url.set_query(Some(&query));
    url
}

/// Authorization request URL
///
/// Carries `response_type=code`, client id, redirect URI, scope (with
/// `openid` ensured), state and the `S256` challenge.
///
/// # Errors
/// Returns [`AuthError::Config`] if the authorization endpoint cannot carry a
/// query string (e.g. a `data:` URL).
pub fn build_authorization_url(
    config: &ProviderConfig,
    challenge: &str,
    state: &str,
) -> AuthResult<Url> {
    if config.authorization_endpoint.cannot_be_a_base() {
        return Err(AuthError::Config(format!(
            "authorization endpoint {} is not a hierarchical URL",
            config.authorization_endpoint
        )));
    }

    let scope = config.effective_scope();
    Ok(append_query(
        &config.authorization_endpoint,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", challenge),
            ("code_challenge_method", CODE_CHALLENGE_METHOD),
        ],
    ))
}

/// Provider logout URL with `id_token_hint` and `post_logout_redirect_uri`
#[must_use]
pub fn build_end_session_url(config: &ProviderConfig, id_token: &str) -> Option<Url> {
    let endpoint = config.end_session_endpoint.as_ref()?;
    Some(append_query(
        endpoint,
        &[
            ("id_token_hint", id_token),
            ("post_logout_redirect_uri", config.post_logout_redirect_uri.as_str()),
        ],
    ))
}

/// reqwest-backed [`OidcClientTrait`] implementation
#[derive(Debug, Clone)]
pub struct OidcClient {
    config: ProviderConfig,
    http: Client,
}

impl OidcClient {
    /// Create a client with the default 30 second request timeout
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_timeout(config, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn with_timeout(config: ProviderConfig, timeout: Duration) -> Self {
        let http = Client::builder().timeout(timeout).build().unwrap_or_else(|err| {
            warn!(error = %err, "HTTP client build failed; using a client without timeout");
            Client::new()
        });
        Self { config, http }
    }

    /// Use a caller-provided HTTP client (shared pools, custom TLS roots)
    #[must_use]
    pub const fn with_http_client(config: ProviderConfig, http: Client) -> Self {
        Self { config, http }
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> AuthResult<TokenResponse> {
        debug!(
            endpoint = %self.config.token_endpoint,
            grant_type = params.iter().find(|(k, _)| *k == "grant_type").map_or("", |(_, v)| *v),
            "token endpoint request"
        );

        let response = self
            .http
            .post(self.config.token_endpoint.clone())
            .form(params)
            .send()
            .await
            .map_err(|e| AuthError::token_exchange(NETWORK_ERROR_CODE, Some(e.to_string())))?;

        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::ParseError(format!("invalid token response: {e}")))
    }

    async fn revoke_one(&self, endpoint: &Url, token: &str, hint: TokenTypeHint) {
        let params = [
            ("token", token),
            ("token_type_hint", hint.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ];

        let result = match self.http.post(endpoint.clone()).form(&params).send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                Err(AuthError::RevocationFailed(format!("status {}", response.status())))
            }
            Err(e) => Err(AuthError::RevocationFailed(e.to_string())),
        };

        match result {
            Ok(()) => debug!(hint = hint.as_str(), "token revoked"),
            Err(err) => warn!(hint = hint.as_str(), error = %err, "token revocation failed"),
        }
    }
}

/// Map a non-2xx token endpoint response to `TokenExchangeFailed`
async fn provider_error(response: Response) -> AuthError {
    let status = response.status();
    match response.json::<OAuthErrorResponse>().await {
        Ok(body) => AuthError::token_exchange(body.error, body.error_description),
        Err(_) => {
            AuthError::token_exchange("token_exchange_failed", Some(format!("status {status}")))
        }
    }
}

#[async_trait]
impl OidcClientTrait for OidcClient {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn exchange_code(&self, code: &str, verifier: &str) -> AuthResult<TokenResponse> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenResponse> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ])
        .await
        .map_err(|err| AuthError::RefreshFailed(err.to_string()))
    }

    async fn revoke(&self, access_token: &str, refresh_token: Option<&str>) {
        let Some(endpoint) = self.config.revocation_endpoint.as_ref() else {
            debug!("no revocation endpoint configured; skipping revocation");
            return;
        };

        self.revoke_one(endpoint, access_token, TokenTypeHint::AccessToken).await;
        if let Some(refresh_token) = refresh_token {
            self.revoke_one(endpoint, refresh_token, TokenTypeHint::RefreshToken).await;
        }
    }

    async fn fetch_userinfo(&self, access_token: &str) -> AuthResult<Map<String, Value>> {
        let endpoint = self.config.userinfo_endpoint.as_ref().ok_or_else(|| {
            AuthError::UserInfoUnavailable("no userinfo endpoint configured".to_string())
        })?;

        debug!(endpoint = %endpoint, "fetching userinfo");
        let response = self
            .http
            .get(endpoint.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::UserInfoUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::UserInfoUnavailable(format!("status {}", response.status())));
        }

        match response.json::<Value>().await {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(AuthError::UserInfoUnavailable("response is not a JSON object".into())),
            Err(e) => Err(AuthError::UserInfoUnavailable(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::client.
    use std::collections::HashMap;

    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config_for(server: &MockServer) -> ProviderConfig {
        let base = server.uri();
        ProviderConfig::new(
            Url::parse(&format!("{base}/authorize")).unwrap(),
            Url::parse(&format!("{base}/token")).unwrap(),
            "app-client",
            "https://app.example.com/callback",
        )
        .with_userinfo_endpoint(Url::parse(&format!("{base}/userinfo")).unwrap())
        .with_revocation_endpoint(Url::parse(&format!("{base}/revoke")).unwrap())
    }

    fn static_config() -> ProviderConfig {
        ProviderConfig::new(
            Url::parse("https://idp.example.com/authorize").unwrap(),
            Url::parse("https://idp.example.com/token").unwrap(),
            "app-client",
            "https://app.example.com/callback",
        )
    }

    fn query_map(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    /// Validates `build_authorization_url` for the required parameters
    /// scenario.
    ///
    /// Assertions:
    /// - Every protocol parameter is present and decodes to the input.
    /// - The scope always contains `openid`.
    #[test]
    fn test_authorization_url_parameters() {
        let config = static_config().with_scope("profile email");
        let url = build_authorization_url(&config, "challenge-abc", "state-123").unwrap();

        assert_eq!(url.path(), "/authorize");
        let query = query_map(&url);
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["client_id"], "app-client");
        assert_eq!(query["redirect_uri"], "https://app.example.com/callback");
        assert_eq!(query["scope"], "openid profile email");
        assert_eq!(query["state"], "state-123");
        assert_eq!(query["code_challenge"], "challenge-abc");
        assert_eq!(query["code_challenge_method"], "S256");
    }

    #[test]
    fn test_authorization_url_keeps_existing_query() {
        let mut config = static_config();
        config.authorization_endpoint =
            Url::parse("https://idp.example.com/authorize?tenant=acme").unwrap();

        let url = build_authorization_url(&config, "c", "s").unwrap();
        let query = query_map(&url);
        assert_eq!(query["tenant"], "acme");
        assert_eq!(query["state"], "s");
    }

    #[test]
    fn test_end_session_url() {
        assert!(build_end_session_url(&static_config(), "id.token.value").is_none());

        let config = static_config()
            .with_end_session_endpoint(Url::parse("https://idp.example.com/logout").unwrap())
            .with_post_logout_redirect_uri("https://app.example.com/bye");
        let url = build_end_session_url(&config, "id.token.value").unwrap();
        let query = query_map(&url);
        assert_eq!(query["id_token_hint"], "id.token.value");
        assert_eq!(query["post_logout_redirect_uri"], "https://app.example.com/bye");
    }

    /// Validates `OidcClient::exchange_code` for the successful form post
    /// scenario.
    ///
    /// Assertions:
    /// - Request is form-encoded with grant type, code and verifier.
    /// - Response fields are parsed, `token_type` defaults to `Bearer`.
    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("code_verifier=verifier-xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-1",
                "id_token": "h.p.s",
                "refresh_token": "rt-1",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OidcClient::new(config_for(&server));
        let tokens = client.exchange_code("auth-code", "verifier-xyz").await.unwrap();

        assert_eq!(tokens.access_token, "at-1");
        assert_eq!(tokens.id_token.as_deref(), Some("h.p.s"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_exchange_code_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "code expired"
            })))
            .mount(&server)
            .await;

        let client = OidcClient::new(config_for(&server));
        match client.exchange_code("stale", "v").await {
            Err(AuthError::TokenExchangeFailed { error, description }) => {
                assert_eq!(error, "invalid_grant");
                assert_eq!(description.as_deref(), Some("code expired"));
            }
            other => panic!("expected TokenExchangeFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exchange_code_unreadable_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let client = OidcClient::new(config_for(&server));
        let err = client.exchange_code("c", "v").await.unwrap_err();
        assert_eq!(err.provider_error_code(), Some("token_exchange_failed"));
        assert!(!err.is_retryable());
    }

    /// Validates `OidcClient::exchange_code` for the unreachable endpoint
    /// scenario.
    #[tokio::test]
    async fn test_exchange_code_network_error() {
        let config = ProviderConfig::new(
            Url::parse("http://127.0.0.1:1/authorize").unwrap(),
            Url::parse("http://127.0.0.1:1/token").unwrap(),
            "app-client",
            "https://app.example.com/callback",
        );
        let client = OidcClient::with_timeout(config, Duration::from_secs(2));

        let err = client.exchange_code("c", "v").await.unwrap_err();
        assert_eq!(err.provider_error_code(), Some(NETWORK_ERROR_CODE));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_refresh_failure_maps_to_refresh_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
            .mount(&server)
            .await;

        let client = OidcClient::new(config_for(&server));
        let err = client.refresh("rt-old").await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshFailed(ref msg) if msg.contains("invalid_grant")));
    }

    /// Validates `OidcClient::revoke` for the two-token scenario.
    ///
    /// Assertions:
    /// - Access and refresh tokens are revoked with their type hints.
    /// - A failing revocation response does not surface an error.
    #[tokio::test]
    async fn test_revoke_sends_both_hints_and_absorbs_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .and(body_string_contains("token_type_hint=access_token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .and(body_string_contains("token_type_hint=refresh_token"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = OidcClient::new(config_for(&server));
        client.revoke("at-1", Some("rt-1")).await;
    }

    #[tokio::test]
    async fn test_revoke_without_endpoint_is_noop() {
        let client = OidcClient::new(static_config());
        client.revoke("at-1", None).await;
    }

    #[tokio::test]
    async fn test_fetch_userinfo() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"sub": "user-1", "email": "b@x"})),
            )
            .mount(&server)
            .await;

        let client = OidcClient::new(config_for(&server));
        let info = client.fetch_userinfo("at-1").await.unwrap();
        assert_eq!(info["email"], "b@x");
    }

    #[tokio::test]
    async fn test_fetch_userinfo_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = OidcClient::new(config_for(&server));
        assert!(matches!(
            client.fetch_userinfo("at-1").await,
            Err(AuthError::UserInfoUnavailable(_))
        ));

        let without_endpoint = OidcClient::new(static_config());
        assert!(matches!(
            without_endpoint.fetch_userinfo("at-1").await,
            Err(AuthError::UserInfoUnavailable(_))
        ));
    }
}
