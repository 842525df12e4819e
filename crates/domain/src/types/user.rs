//! User profile types
//!
//! Derived from the most recently validated identity claims (optionally
//! merged with UserInfo data). Never persisted on its own.

use serde::{Deserialize, Serialize};

/// Profile of the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Subject claim
    pub id: String,
    pub email: String,
    pub name: String,
    /// Roles in claim order
    pub roles: Vec<String>,
    /// Permissions in claim order
    pub permissions: Vec<String>,
}

impl UserProfile {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}
