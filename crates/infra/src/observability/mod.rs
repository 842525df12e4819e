//! Logging setup
//!
//! Installs the global `tracing` subscriber for hosts embedding the identity
//! client. Filtering follows `RUST_LOG` (default `info`); output is
//! human-readable unless JSON is requested.
//!
//! ```no_run
//! use portcullis_infra::observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::from_env()).ok();
//! tracing::info!("identity client starting");
//! ```

use std::str::FromStr;

use portcullis_domain::{AuthError, AuthResult};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "PORTCULLIS_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Format from [`LOG_FORMAT_ENV`]; unset or unrecognised values are
    /// [`LogFormat::Pretty`].
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV).ok().and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" | "" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("Invalid LogFormat: {other}")),
        }
    }
}

/// Build the filter from `RUST_LOG`, falling back to `info`
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber
///
/// # Errors
/// Returns `AuthError::Config` if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> AuthResult<()> {
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(json.then(|| fmt::layer().json().with_current_span(false)))
        .with((!json).then(fmt::layer))
        .try_init()
        .map_err(|e| AuthError::Config(format!("Failed to install tracing subscriber: {e}")))
}
