//! Macro for implementing Display and FromStr for state enums
//!
//! # Example
//!
//! ```rust
//! use portcullis_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum GrantKind {
//!     AuthorizationCode,
//!     RefreshToken,
//! }
//!
//! impl_domain_status_conversions!(GrantKind {
//!     AuthorizationCode => "authorization_code",
//!     RefreshToken => "refresh_token",
//! });
//!
//! assert_eq!(GrantKind::RefreshToken.to_string(), "refresh_token");
//! ```

/// Implements Display and FromStr traits for state enums
///
/// - Display writes the mapped string
/// - FromStr parses case-insensitively and reports the enum name on failure
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
