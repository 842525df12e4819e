//! Protocol constants
//!
//! Centralized location for the storage keys, defaults and time buffers
//! shared by the identity client crates.

// PKCE
pub const PKCE_VERIFIER_LENGTH: usize = 128;
pub const PKCE_UNRESERVED_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
pub const CODE_CHALLENGE_METHOD: &str = "S256";
pub const STATE_BYTES: usize = 16;

// Ephemeral (tab-scoped) storage keys
pub const STORAGE_KEY_PKCE_VERIFIER: &str = "pkce_verifier";
pub const STORAGE_KEY_OAUTH_STATE: &str = "oauth_state";
pub const STORAGE_KEY_RETURN_PATH: &str = "redirect_after_login";

// Token timing (seconds)
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 5 * 60;
pub const CLOCK_SKEW_TOLERANCE_SECS: i64 = 5 * 60;
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 60;

// Configuration defaults
pub const DEFAULT_SCOPE: &str = "openid profile email";
pub const DEFAULT_ROLES_CLAIM: &str = "roles";
pub const DEFAULT_PERMISSIONS_CLAIM: &str = "permissions";
pub const DEFAULT_POST_LOGOUT_REDIRECT: &str = "/";
pub const OPENID_SCOPE: &str = "openid";

// HTTP
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// Routing
pub const LOGIN_PATH: &str = "/login";
