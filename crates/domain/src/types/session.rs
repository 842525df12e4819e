//! Session state owned by the lifecycle manager

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::claims::IdentityClaims;
use super::user::UserProfile;
use crate::impl_domain_status_conversions;

/// Lifecycle state of the single session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Anonymous,
    /// Authorization redirect issued, waiting for the callback
    LoggingIn,
    Authenticated,
    /// Refresh grant in flight; tokens from the previous grant stay readable
    Refreshing,
}

impl_domain_status_conversions!(SessionState {
    Anonymous => "anonymous",
    LoggingIn => "logging_in",
    Authenticated => "authenticated",
    Refreshing => "refreshing",
});

/// Authoritative in-memory session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_claims: Option<IdentityClaims>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    /// Absolute access token expiry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Unauthenticated session
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Whether the token triple is present and unexpired at `now`.
    ///
    /// This ignores the monitoring buffer: a session inside the refresh
    /// window is still valid.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, &self.id_token, self.expires_at) {
            (Some(_), Some(_), Some(expires_at)) => now < expires_at,
            _ => false,
        }
    }

    /// Seconds until access token expiry, negative once expired.
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|expires_at| (expires_at - now).num_seconds())
    }

    #[must_use]
    pub fn roles(&self) -> &[String] {
        self.profile.as_ref().map(|p| p.roles.as_slice()).unwrap_or_default()
    }

    #[must_use]
    pub fn permissions(&self) -> &[String] {
        self.profile.as_ref().map(|p| p.permissions.as_slice()).unwrap_or_default()
    }
}
