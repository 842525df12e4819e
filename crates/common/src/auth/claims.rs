//! Claims mapping
//!
//! Resolves dotted claim paths, extracts role/permission lists and merges
//! identity-token claims with UserInfo data into a [`UserProfile`].

use portcullis_domain::{IdentityClaims, UserProfile};
use serde_json::{Map, Value};

/// Walk a dotted path (`realm_access.roles`) through nested JSON objects.
///
/// Returns `None` as soon as a segment is missing or a non-object is reached
/// before the last segment.
#[must_use]
pub fn resolve_path<'a>(claims: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut segments = path.split('.');
    let mut current = claims.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Read a list-valued claim
///
/// - a JSON array keeps its string elements in order
/// - a single string is a one-element list
/// - anything else, or a missing claim, is an empty list
#[must_use]
pub fn extract_list(claims: &Map<String, Value>, path: &str) -> Vec<String> {
    match resolve_path(claims, path) {
        Some(Value::Array(items)) => {
            items.iter().filter_map(Value::as_str).map(str::to_string).collect()
        }
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Merge UserInfo over the identity claims; UserInfo wins on conflicts.
#[must_use]
pub fn merge_claims(
    identity: &IdentityClaims,
    userinfo: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    let mut merged = identity.to_value();
    if let Some(info) = userinfo {
        for (key, value) in info {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Build the user profile from validated claims and optional UserInfo
///
/// Roles and permissions are read from the merged claim set so either source
/// can carry them. Empty strings count as absent in the fallback chains.
#[must_use]
pub fn build_profile(
    identity: &IdentityClaims,
    userinfo: Option<&Map<String, Value>>,
    roles_claim: &str,
    permissions_claim: &str,
) -> UserProfile {
    let merged = merge_claims(identity, userinfo);
    let info_str = |key: &str| {
        userinfo.and_then(|info| info.get(key)).and_then(Value::as_str).filter(|s| !s.is_empty())
    };
    fn identity_str(value: Option<&String>) -> Option<&str> {
        value.map(String::as_str).filter(|s| !s.is_empty())
    }

    let id = merged
        .get("sub")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(identity.sub.as_str());

    let email = info_str("email").or_else(|| identity_str(identity.email.as_ref())).unwrap_or("");

    let name = info_str("name")
        .or_else(|| identity_str(identity.name.as_ref()))
        .or_else(|| info_str("preferred_username"))
        .or_else(|| identity_str(identity.preferred_username.as_ref()))
        .unwrap_or("");

    UserProfile {
        id: id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        roles: extract_list(&merged, roles_claim),
        permissions: extract_list(&merged, permissions_claim),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::claims.
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("fixture must be an object"),
        }
    }

    fn identity(value: Value) -> IdentityClaims {
        serde_json::from_value(value).unwrap()
    }

    /// Validates `resolve_path` for the nested lookup scenario.
    ///
    /// Assertions:
    /// - Nested objects are walked by segment.
    /// - Traversal through a list or scalar yields `None`.
    /// - Empty path yields `None`.
    #[test]
    fn test_resolve_path() {
        let claims = object(json!({
            "realm_access": {"roles": ["admin"]},
            "groups": ["a", "b"],
            "tier": "gold"
        }));

        assert_eq!(resolve_path(&claims, "realm_access.roles"), Some(&json!(["admin"])));
        assert_eq!(resolve_path(&claims, "tier"), Some(&json!("gold")));
        assert_eq!(resolve_path(&claims, "groups.0"), None);
        assert_eq!(resolve_path(&claims, "tier.level"), None);
        assert_eq!(resolve_path(&claims, "missing.path"), None);
        assert_eq!(resolve_path(&claims, ""), None);
    }

    #[test]
    fn test_extract_list_shapes() {
        let claims = object(json!({
            "arr": ["read", 7, "write"],
            "group": "Domain Admins",
            "num": 42,
            "nothing": null
        }));

        assert_eq!(extract_list(&claims, "arr"), vec!["read", "write"]);
        assert_eq!(extract_list(&claims, "group"), vec!["Domain Admins"]);
        assert!(extract_list(&claims, "num").is_empty());
        assert!(extract_list(&claims, "nothing").is_empty());
        assert!(extract_list(&claims, "absent").is_empty());
    }

    /// Validates `build_profile` for the nested roles path scenario.
    #[test]
    fn test_nested_role_path() {
        let claims = identity(json!({
            "sub": "user-1",
            "realm_access": {"roles": ["admin", "viewer"]}
        }));

        let profile = build_profile(&claims, None, "realm_access.roles", "permissions");
        assert_eq!(profile.roles, vec!["admin", "viewer"]);
        assert!(profile.permissions.is_empty());
    }

    /// Validates `build_profile` for the UserInfo precedence scenario.
    ///
    /// Assertions:
    /// - UserInfo email wins over the identity token email.
    /// - Name falls back to the identity token when UserInfo lacks it.
    /// - Permissions present only in UserInfo are extracted.
    #[test]
    fn test_userinfo_precedence() {
        let claims = identity(json!({
            "sub": "user-1",
            "email": "a@x",
            "name": "Token Name",
            "roles": ["viewer"]
        }));
        let userinfo = object(json!({"email": "b@x", "permissions": "reports:read"}));

        let profile = build_profile(&claims, Some(&userinfo), "roles", "permissions");
        assert_eq!(profile.id, "user-1");
        assert_eq!(profile.email, "b@x");
        assert_eq!(profile.name, "Token Name");
        assert_eq!(profile.roles, vec!["viewer"]);
        assert_eq!(profile.permissions, vec!["reports:read"]);
    }

    /// Validates `build_profile` for the name fallback chain scenario.
    #[test]
    fn test_name_fallback_chain() {
        let claims = identity(json!({"sub": "u", "preferred_username": "token-user"}));

        let with_info_username = object(json!({"preferred_username": "info-user", "name": ""}));
        assert_eq!(
            build_profile(&claims, Some(&with_info_username), "roles", "permissions").name,
            "info-user"
        );

        assert_eq!(build_profile(&claims, None, "roles", "permissions").name, "token-user");

        let bare = identity(json!({"sub": "u"}));
        let profile = build_profile(&bare, None, "roles", "permissions");
        assert_eq!(profile.name, "");
        assert_eq!(profile.email, "");
    }

    #[test]
    fn test_userinfo_subject_preferred() {
        let claims = identity(json!({"sub": "token-sub"}));
        let userinfo = object(json!({"sub": "info-sub"}));
        assert_eq!(build_profile(&claims, Some(&userinfo), "roles", "permissions").id, "info-sub");
    }

    #[test]
    fn test_merge_overrides_nested_objects_wholesale() {
        let claims = identity(json!({"sub": "u", "realm_access": {"roles": ["a"], "extra": 1}}));
        let userinfo = object(json!({"realm_access": {"roles": ["b"]}}));

        let merged = merge_claims(&claims, Some(&userinfo));
        assert_eq!(merged["realm_access"], json!({"roles": ["b"]}));
        assert_eq!(merged["sub"], "u");
    }
}
