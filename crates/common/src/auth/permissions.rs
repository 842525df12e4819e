//! Authorization predicates and route access decisions
//!
//! Pure functions over the current profile. Presentation layers call these to
//! decide what to render or where to navigate; nothing here touches the
//! network or storage.

use portcullis_domain::constants::LOGIN_PATH;
use portcullis_domain::UserProfile;

/// Borrowed view over the signed-in user's roles and permissions
///
/// `None` means anonymous; every predicate is then false.
#[derive(Debug, Clone, Copy, Default)]
pub struct Permissions<'a> {
    profile: Option<&'a UserProfile>,
}

impl<'a> Permissions<'a> {
    #[must_use]
    pub const fn new(profile: Option<&'a UserProfile>) -> Self {
        Self { profile }
    }

    #[must_use]
    pub const fn anonymous() -> Self {
        Self { profile: None }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.profile.is_some()
    }

    #[must_use]
    pub fn roles(&self) -> &'a [String] {
        self.profile.map(|p| p.roles.as_slice()).unwrap_or_default()
    }

    #[must_use]
    pub fn permissions(&self) -> &'a [String] {
        self.profile.map(|p| p.permissions.as_slice()).unwrap_or_default()
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.profile.is_some_and(|p| p.has_role(role))
    }

    /// True if any of `roles` is held; an empty list is false.
    #[must_use]
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|r| self.has_role(r.as_ref()))
    }

    /// True if every one of `roles` is held; an empty list is true only when
    /// authenticated.
    #[must_use]
    pub fn has_all_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.is_authenticated() && roles.iter().all(|r| self.has_role(r.as_ref()))
    }

    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.profile.is_some_and(|p| p.has_permission(permission))
    }

    #[must_use]
    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        permissions.iter().any(|p| self.has_permission(p.as_ref()))
    }

    #[must_use]
    pub fn has_all_permissions<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        self.is_authenticated() && permissions.iter().all(|p| self.has_permission(p.as_ref()))
    }
}

/// Access requirements of a navigation target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRequirement<'a> {
    /// Full requested path, query included
    pub path: &'a str,
    pub requires_auth: bool,
    pub permission: Option<&'a str>,
}

impl<'a> RouteRequirement<'a> {
    /// Protected route with no permission requirement
    #[must_use]
    pub const fn protected(path: &'a str) -> Self {
        Self { path, requires_auth: true, permission: None }
    }

    #[must_use]
    pub const fn public(path: &'a str) -> Self {
        Self { path, requires_auth: false, permission: None }
    }

    #[must_use]
    pub const fn with_permission(self, permission: &'a str) -> Self {
        Self { permission: Some(permission), ..self }
    }
}

/// Outcome of [`check_access`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    /// Send the user to login; `return_path` is where to come back to
    RequireLogin { return_path: Option<String> },
    Forbidden { missing_permission: String },
}

/// Decide whether navigation to `requirement` may proceed.
#[must_use]
pub fn check_access(requirement: &RouteRequirement<'_>, view: &Permissions<'_>) -> AccessDecision {
    if !requirement.requires_auth {
        return AccessDecision::Allow;
    }

    if !view.is_authenticated() {
        let return_path = (requirement.path != LOGIN_PATH).then(|| requirement.path.to_string());
        return AccessDecision::RequireLogin { return_path };
    }

    match requirement.permission {
        Some(permission) if !view.has_permission(permission) => {
            AccessDecision::Forbidden { missing_permission: permission.to_string() }
        }
        _ => AccessDecision::Allow,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::permissions.
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: "user-1".to_string(),
            roles: vec!["admin".to_string(), "viewer".to_string()],
            permissions: vec!["reports:read".to_string()],
            ..UserProfile::default()
        }
    }

    #[test]
    fn test_anonymous_is_always_false() {
        let view = Permissions::anonymous();
        assert!(!view.has_role("admin"));
        assert!(!view.has_permission("reports:read"));
        assert!(!view.has_any_role(&["admin"]));
        assert!(!view.has_all_roles::<&str>(&[]));
        assert!(!view.has_all_permissions::<&str>(&[]));
        assert!(view.roles().is_empty());
    }

    /// Validates `Permissions` for the any/all role combinations scenario.
    ///
    /// Assertions:
    /// - `has_any_role` is true when one of the roles is held.
    /// - `has_all_roles` requires every role.
    /// - Empty lists: any is false, all is true.
    #[test]
    fn test_role_combinations() {
        let profile = profile();
        let view = Permissions::new(Some(&profile));

        assert!(view.has_any_role(&["admin", "x"]));
        assert!(!view.has_all_roles(&["admin", "x"]));
        assert!(view.has_all_roles(&["admin", "viewer"]));
        assert!(!view.has_any_role::<&str>(&[]));
        assert!(view.has_all_roles::<&str>(&[]));
    }

    #[test]
    fn test_permission_combinations() {
        let profile = profile();
        let view = Permissions::new(Some(&profile));

        assert!(view.has_permission("reports:read"));
        assert!(!view.has_permission("reports:write"));
        let wanted = vec!["reports:write".to_string(), "reports:read".to_string()];
        assert!(view.has_any_permission(&wanted));
        assert!(!view.has_all_permissions(&["reports:read", "reports:write"]));
    }

    #[test]
    fn test_public_route_always_allowed() {
        let decision = check_access(&RouteRequirement::public("/about"), &Permissions::anonymous());
        assert_eq!(decision, AccessDecision::Allow);
    }

    /// Validates `check_access` for the anonymous protected route scenario.
    ///
    /// Assertions:
    /// - The requested path is carried as the return path.
    /// - The login route itself is never recorded.
    #[test]
    fn test_protected_route_requires_login() {
        let view = Permissions::anonymous();

        assert_eq!(
            check_access(&RouteRequirement::protected("/reports?range=7d"), &view),
            AccessDecision::RequireLogin { return_path: Some("/reports?range=7d".to_string()) }
        );
        assert_eq!(
            check_access(&RouteRequirement::protected("/login"), &view),
            AccessDecision::RequireLogin { return_path: None }
        );
    }

    #[test]
    fn test_permission_gate() {
        let profile = profile();
        let view = Permissions::new(Some(&profile));

        let allowed = RouteRequirement::protected("/reports").with_permission("reports:read");
        assert_eq!(check_access(&allowed, &view), AccessDecision::Allow);

        let denied = RouteRequirement::protected("/admin").with_permission("admin:write");
        assert_eq!(
            check_access(&denied, &view),
            AccessDecision::Forbidden { missing_permission: "admin:write".to_string() }
        );
    }
}
