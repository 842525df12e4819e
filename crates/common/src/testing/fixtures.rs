//! Provider, claims and token fixtures
//!
//! Tokens are unsigned (`alg: none`); the client never verifies signatures,
//! so these decode exactly like provider-issued tokens.

use portcullis_domain::{Audience, IdentityClaims, ProviderConfig, TokenResponse};
use serde_json::{Map, Value};
use url::Url;

use crate::auth::token::encode_unsigned;

pub const TEST_ISSUER: &str = "https://idp.example.com";
pub const TEST_CLIENT_ID: &str = "portcullis-test-client";
pub const TEST_REDIRECT_URI: &str = "https://app.example.com/callback";

/// Provider configuration with every endpoint under `base`
///
/// Includes userinfo, end-session and revocation endpoints and expects
/// [`TEST_ISSUER`]. An unparsable `base` falls back to `https://idp.example.com`.
#[must_use]
pub fn provider_config(base: &str) -> ProviderConfig {
    let base = base.trim_end_matches('/');
    let endpoint = |path: &str| {
        Url::parse(&format!("{base}{path}"))
            .or_else(|_| Url::parse(&format!("{TEST_ISSUER}{path}")))
            .unwrap_or_else(|_| unreachable!("fallback endpoint is a valid URL"))
    };

    ProviderConfig::new(endpoint("/authorize"), endpoint("/token"), TEST_CLIENT_ID, TEST_REDIRECT_URI)
        .with_userinfo_endpoint(endpoint("/userinfo"))
        .with_end_session_endpoint(endpoint("/logout"))
        .with_revocation_endpoint(endpoint("/revoke"))
        .with_issuer(TEST_ISSUER)
}

/// Claims that pass validation at `now` and expire `lifetime_secs` later
#[must_use]
pub fn identity_claims(now: i64, lifetime_secs: i64) -> IdentityClaims {
    IdentityClaims {
        iss: TEST_ISSUER.to_string(),
        sub: "user-123".to_string(),
        aud: Audience::Single(TEST_CLIENT_ID.to_string()),
        exp: Some(now + lifetime_secs),
        iat: Some(now),
        email: Some("ada@example.com".to_string()),
        name: Some("Ada Lovelace".to_string()),
        preferred_username: Some("ada".to_string()),
        ..IdentityClaims::default()
    }
}

/// `claims` with extra top-level entries merged in
#[must_use]
pub fn with_extra(mut claims: IdentityClaims, extra: Value) -> IdentityClaims {
    if let Value::Object(map) = extra {
        claims.extra.extend(map);
    }
    claims
}

/// Encode `claims` as an unsigned compact token
#[must_use]
pub fn id_token(claims: &IdentityClaims) -> String {
    encode_unsigned(claims).unwrap_or_default()
}

/// Token endpoint response carrying an identity token for `claims`
#[must_use]
pub fn token_response(claims: &IdentityClaims, expires_in: i64) -> TokenResponse {
    TokenResponse {
        access_token: format!("access-{}", claims.iat.unwrap_or_default()),
        id_token: Some(id_token(claims)),
        token_type: "Bearer".to_string(),
        expires_in,
        refresh_token: Some(format!("refresh-{}", claims.iat.unwrap_or_default())),
        scope: Some("openid profile email".to_string()),
    }
}

/// JSON object from a `json!` literal; non-objects yield an empty map
#[must_use]
pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
