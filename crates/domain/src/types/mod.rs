//! Identity data model
//!
//! Claims, profile, session and token endpoint types shared by the
//! protocol client and the session lifecycle manager.

pub mod claims;
pub mod session;
pub mod token;
pub mod user;

pub use claims::{Audience, IdentityClaims};
pub use session::{Session, SessionState};
pub use token::{OAuthErrorResponse, TokenResponse, TokenTypeHint};
pub use user::UserProfile;
