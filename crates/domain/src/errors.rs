//! Error types used throughout the identity client
//!
//! `AuthError` is the single taxonomy shared by the protocol client, the
//! token codec and the session lifecycle manager. The manager decides the
//! policy (abort login, fall back, force logout) from the variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Portcullis
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum AuthError {
    /// Token is not three non-empty dot-separated segments
    #[error("Invalid token format: {0}")]
    InvalidFormat(String),

    /// Token payload (or a response body) could not be decoded or parsed
    #[error("Failed to parse token payload: {0}")]
    ParseError(String),

    /// Token endpoint rejected the authorization code
    #[error("Token exchange failed: {error}")]
    TokenExchangeFailed { error: String, description: Option<String> },

    /// Refresh grant failed for any reason
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// No PKCE verifier in ephemeral storage when the callback arrived
    #[error("PKCE verifier not found; login must be restarted")]
    MissingVerifier,

    #[error("Invalid token issuer. Expected: {expected}, Got: {actual}")]
    IssuerMismatch { expected: String, actual: String },

    #[error("Invalid token audience. Expected: {expected}, Got: {actual}")]
    AudienceMismatch { expected: String, actual: String },

    #[error("ID token has expired")]
    Expired,

    #[error("ID token issued in the future")]
    IssuedInFuture,

    /// UserInfo endpoint could not be used; callers fall back to ID-token claims
    #[error("UserInfo unavailable: {0}")]
    UserInfoUnavailable(String),

    /// Revocation request failed; only ever logged
    #[error("Token revocation failed: {0}")]
    RevocationFailed(String),

    /// Provider redirected back with an `error` parameter
    #[error("Authorization denied by provider: {error}")]
    AuthorizationDenied { error: String, description: Option<String> },

    #[error("Authorization code missing from callback")]
    MissingAuthorizationCode,

    /// Callback `state` does not match the value sent with the authorization request
    #[error("State mismatch in authorization callback")]
    StateMismatch,

    /// Secure randomness source unavailable
    #[error("Secure random number generation failed: {0}")]
    Randomness(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias for identity client operations
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Error severity levels for logging decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// Absorbed locally, visible only in logs
    Warning,
    /// Fails the current operation
    Error,
    /// Possible tampering or misconfiguration
    Critical,
}

impl AuthError {
    /// Build a `TokenExchangeFailed` from a provider error code.
    pub fn token_exchange(error: impl Into<String>, description: Option<String>) -> Self {
        Self::TokenExchangeFailed { error: error.into(), description }
    }

    /// Provider error code carried by exchange and authorization failures.
    #[must_use]
    pub fn provider_error_code(&self) -> Option<&str> {
        match self {
            Self::TokenExchangeFailed { error, .. } | Self::AuthorizationDenied { error, .. } => {
                Some(error)
            }
            _ => None,
        }
    }

    /// Whether repeating the same operation could succeed.
    ///
    /// Nothing in the login path is retryable: a used code, a consumed
    /// verifier or an invalid token stay invalid. Only transport-level
    /// exchange failures qualify.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TokenExchangeFailed { error, .. } if error == "network_error")
    }

    /// Whether the user has to go through the authorization redirect again.
    #[must_use]
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            Self::MissingVerifier
                | Self::StateMismatch
                | Self::RefreshFailed(_)
                | Self::Expired
                | Self::TokenExchangeFailed { .. }
                | Self::AuthorizationDenied { .. }
                | Self::MissingAuthorizationCode
        )
    }

    /// Failures that are logged and swallowed by the surrounding operation.
    #[must_use]
    pub fn is_absorbed(&self) -> bool {
        matches!(self, Self::UserInfoUnavailable(_) | Self::RevocationFailed(_))
    }

    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UserInfoUnavailable(_) | Self::RevocationFailed(_) => ErrorSeverity::Warning,
            Self::IssuerMismatch { .. }
            | Self::AudienceMismatch { .. }
            | Self::StateMismatch
            | Self::Randomness(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Generic message safe to show to end users.
    ///
    /// Never includes token material, provider descriptions or claim values.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingVerifier | Self::StateMismatch | Self::MissingAuthorizationCode => {
                "Your sign-in attempt could not be completed. Please sign in again."
            }
            Self::AuthorizationDenied { .. } => "Sign-in was cancelled or denied.",
            Self::RefreshFailed(_) | Self::Expired => {
                "Your session has expired. Please sign in again."
            }
            Self::Config(_) => "Authentication is not configured correctly.",
            Self::UserInfoUnavailable(_) | Self::RevocationFailed(_) => {
                "Some account details could not be loaded."
            }
            _ => "Authentication failed. Please try again.",
        }
    }
}
