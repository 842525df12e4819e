//! Identity token claims
//!
//! Decoded payload of the identity token. Standard OIDC claims are typed;
//! every provider-specific field is kept in `extra` so dotted-path lookups
//! (`realm_access.roles`, `resource_access.app.roles`) see the full object.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// `aud` claim: a single client id or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Whether `client_id` is one of the audiences.
    #[must_use]
    pub fn contains(&self, client_id: &str) -> bool {
        match self {
            Self::Single(aud) => aud == client_id,
            Self::Multiple(list) => list.iter().any(|aud| aud == client_id),
        }
    }

    /// Whether no audience is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Multiple(list) if list.is_empty())
    }

    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(aud) => vec![aud.as_str()],
            Self::Multiple(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

impl Default for Audience {
    fn default() -> Self {
        Self::Multiple(Vec::new())
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.values().join(", "))
    }
}

/// Decoded identity token payload
///
/// Typed fields are read leniently: timestamps accept any JSON number (or a
/// numeric string) and are truncated to whole seconds, `email_verified`
/// accepts `"true"`/`"false"`, and a typed field holding an unexpected JSON
/// type is moved to `extra` unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IdentityClaims {
    /// Issuer
    #[serde(skip_serializing_if = "String::is_empty")]
    pub iss: String,

    /// Subject (user id at the provider)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sub: String,

    #[serde(skip_serializing_if = "Audience::is_empty")]
    pub aud: Audience,

    /// Expiration time (seconds since UNIX epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued-at time (seconds since UNIX epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Provider-specific claims
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for IdentityClaims {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut extra = Map::<String, Value>::deserialize(deserializer)?;
        let mut claims = Self::default();

        if let Some(value) = take_if(&mut extra, "iss", Value::is_string) {
            claims.iss = string_of(value);
        }
        if let Some(value) = take_if(&mut extra, "sub", Value::is_string) {
            claims.sub = string_of(value);
        }
        if let Some(value) = extra.remove("aud") {
            match serde_json::from_value::<Audience>(value.clone()) {
                Ok(aud) => claims.aud = aud,
                Err(_) if value.is_null() => {}
                Err(_) => {
                    extra.insert("aud".to_string(), value);
                }
            }
        }
        claims.exp = take_parsed(&mut extra, "exp", timestamp_of);
        claims.iat = take_parsed(&mut extra, "iat", timestamp_of);
        claims.email_verified = take_parsed(&mut extra, "email_verified", flag_of);
        claims.email = take_if(&mut extra, "email", Value::is_string).map(string_of);
        claims.name = take_if(&mut extra, "name", Value::is_string).map(string_of);
        claims.preferred_username =
            take_if(&mut extra, "preferred_username", Value::is_string).map(string_of);

        claims.extra = extra;
        Ok(claims)
    }
}

/// Remove `key` when `accept` holds; `null` is dropped, anything else stays.
fn take_if(map: &mut Map<String, Value>, key: &str, accept: fn(&Value) -> bool) -> Option<Value> {
    match map.get(key) {
        Some(Value::Null) => {
            map.remove(key);
            None
        }
        Some(value) if accept(value) => map.remove(key),
        _ => None,
    }
}

fn take_parsed<T>(
    map: &mut Map<String, Value>,
    key: &str,
    parse: fn(&Value) -> Option<T>,
) -> Option<T> {
    if map.get(key).is_some_and(Value::is_null) {
        map.remove(key);
        return None;
    }
    let parsed = map.get(key).and_then(parse)?;
    map.remove(key);
    Some(parsed)
}

fn string_of(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64),
        _ => None,
    }
}

fn flag_of(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

impl IdentityClaims {
    /// Full claim set as a JSON object, typed fields included.
    #[must_use]
    pub fn to_value(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
