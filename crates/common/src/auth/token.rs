//! Identity token codec and validation
//!
//! Tokens are decoded without verifying the signature. Signature checks
//! belong to the resource server; the client only needs the claims to build
//! a profile and to decide when to refresh.
//!
//! Validation runs in a fixed order (issuer, audience, expiry, issued-at) and
//! stops at the first failure.

use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use portcullis_domain::constants::{CLOCK_SKEW_TOLERANCE_SECS, DEFAULT_EXPIRY_BUFFER_SECS};
use portcullis_domain::{AuthError, AuthResult, IdentityClaims, ProviderConfig};
use serde_json::Value;
use tracing::debug;

/// URL-safe alphabet that tolerates both padded and unpadded segments.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Header used for locally encoded, unsigned tokens
const UNSIGNED_HEADER: &str = r#"{"alg":"none","typ":"JWT"}"#;

/// Signature segment of locally encoded tokens; never checked
const UNSIGNED_SIGNATURE: &str = "unsigned";

/// Whether `token` has exactly three non-empty dot-separated segments.
#[must_use]
pub fn validate_token_structure(token: &str) -> bool {
    let mut segments = 0;
    for segment in token.split('.') {
        if segment.is_empty() {
            return false;
        }
        segments += 1;
    }
    segments == 3
}

/// Decode the payload of a compact token into [`IdentityClaims`]
///
/// # Errors
/// - [`AuthError::InvalidFormat`] if the token does not have three non-empty
///   segments
/// - [`AuthError::ParseError`] if the payload is not base64url JSON object
pub fn decode(token: &str) -> AuthResult<IdentityClaims> {
    if !validate_token_structure(token) {
        return Err(AuthError::InvalidFormat(format!(
            "expected 3 non-empty segments, found {}",
            token.split('.').filter(|s| !s.is_empty()).count()
        )));
    }

    let payload = token.split('.').nth(1).unwrap_or_default();
    let value = decode_segment(payload)?;
    if !value.is_object() {
        return Err(AuthError::ParseError("payload is not a JSON object".to_string()));
    }

    serde_json::from_value(value).map_err(|e| AuthError::ParseError(e.to_string()))
}

fn decode_segment(segment: &str) -> AuthResult<Value> {
    // Some providers emit standard-alphabet segments; normalize before decoding.
    let normalized: String = segment
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = URL_SAFE_LENIENT
        .decode(normalized.as_bytes())
        .map_err(|e| AuthError::ParseError(format!("invalid base64url payload: {e}")))?;

    serde_json::from_slice(&bytes).map_err(|e| AuthError::ParseError(e.to_string()))
}

/// Encode claims as an unsigned compact token (`alg: none`, placeholder
/// signature)
///
/// Produces tokens [`decode`] accepts; used for fixtures and local tooling.
///
/// # Errors
/// Returns [`AuthError::ParseError`] if the claims cannot be serialized.
pub fn encode_unsigned(claims: &IdentityClaims) -> AuthResult<String> {
    let payload = serde_json::to_vec(claims).map_err(|e| AuthError::ParseError(e.to_string()))?;
    Ok(format!(
        "{}.{}.{UNSIGNED_SIGNATURE}",
        URL_SAFE_NO_PAD.encode(UNSIGNED_HEADER),
        URL_SAFE_NO_PAD.encode(payload)
    ))
}

/// Validate decoded claims against the provider configuration
///
/// `now` is seconds since the UNIX epoch.
///
/// # Errors
/// - [`AuthError::IssuerMismatch`] when an issuer is configured and differs
/// - [`AuthError::AudienceMismatch`] when the client id is not an audience
/// - [`AuthError::Expired`] when the token is within the expiry buffer
/// - [`AuthError::IssuedInFuture`] when `iat` is beyond the skew tolerance
pub fn validate(claims: &IdentityClaims, config: &ProviderConfig, now: i64) -> AuthResult<()> {
    if let Some(expected) = config.issuer.as_deref().filter(|iss| !iss.is_empty()) {
        if claims.iss != expected {
            return Err(AuthError::IssuerMismatch {
                expected: expected.to_string(),
                actual: claims.iss.clone(),
            });
        }
    }

    if !claims.aud.contains(&config.client_id) {
        return Err(AuthError::AudienceMismatch {
            expected: config.client_id.clone(),
            actual: claims.aud.to_string(),
        });
    }

    if is_expired(claims, DEFAULT_EXPIRY_BUFFER_SECS, now) {
        return Err(AuthError::Expired);
    }

    if let Some(iat) = claims.iat {
        if iat > now + CLOCK_SKEW_TOLERANCE_SECS {
            return Err(AuthError::IssuedInFuture);
        }
    }

    debug!(sub = %claims.sub, "identity token claims validated");
    Ok(())
}

/// Whether the claims expire within `buffer_secs` of `now`.
///
/// Missing `exp` counts as expired.
#[must_use]
pub fn is_expired(claims: &IdentityClaims, buffer_secs: i64, now: i64) -> bool {
    claims.exp.map_or(true, |exp| now >= exp.saturating_sub(buffer_secs))
}

/// Decode `token` and check [`is_expired`]; undecodable tokens are expired.
#[must_use]
pub fn is_token_expired(token: &str, buffer_secs: i64, now: i64) -> bool {
    decode(token).map_or(true, |claims| is_expired(&claims, buffer_secs, now))
}
