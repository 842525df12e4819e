//! Integration tests for configuration loader
//!
//! Tests loading provider settings from files and handing the result to the
//! protocol client.

use std::io::Write;

use portcullis_common::auth::{OidcClient, OidcClientTrait};
use portcullis_infra::config;
use tempfile::NamedTempFile;

fn write_settings(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_full_settings_from_toml_file() {
    let path = write_settings(
        r#"
authorization_endpoint = "https://idp.example.com/realms/app/protocol/openid-connect/auth"
token_endpoint = "https://idp.example.com/realms/app/protocol/openid-connect/token"
userinfo_endpoint = "https://idp.example.com/realms/app/protocol/openid-connect/userinfo"
end_session_endpoint = "https://idp.example.com/realms/app/protocol/openid-connect/logout"
revocation_endpoint = "https://idp.example.com/realms/app/protocol/openid-connect/revoke"
issuer = "https://idp.example.com/realms/app"
client_id = "web-console"
redirect_uri = "https://console.example.com/callback"
post_logout_redirect_uri = "https://console.example.com/"
scope = "openid profile email offline_access"
roles_claim = "realm_access.roles"
permissions_claim = "resource_access.web-console.roles"
"#,
        "toml",
    );

    let resolved = config::load_from_file(Some(path.clone())).expect("settings should load");
    assert!(resolved.deprecation.is_none());

    let provider = resolved.config;
    assert_eq!(provider.issuer.as_deref(), Some("https://idp.example.com/realms/app"));
    assert_eq!(provider.roles_claim, "realm_access.roles");
    assert_eq!(provider.post_logout_redirect_uri, "https://console.example.com/");

    let client = OidcClient::new(provider);
    let url = client.authorization_url("challenge", "state").expect("authorization url");
    assert!(url.as_str().contains("client_id=web-console"));
    assert!(url.as_str().contains("scope=openid%20profile%20email%20offline_access"));

    let logout = client.end_session_url("id.token.value").expect("end session url");
    assert!(logout.as_str().contains("id_token_hint=id.token.value"));

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_nested_settings_from_json_file() {
    let path = write_settings(
        r#"{
            "oidc": {
                "authorization_endpoint": "https://idp.example.com/authorize",
                "token_endpoint": "https://idp.example.com/token",
                "client_id": "  padded-client  ",
                "redirect_uri": "https://app.example.com/callback",
                "userinfo_endpoint": ""
            }
        }"#,
        "json",
    );

    let resolved = config::load_from_file(Some(path.clone())).expect("settings should load");
    assert_eq!(resolved.config.client_id, "padded-client");
    assert!(resolved.config.userinfo_endpoint.is_none(), "Empty values count as absent");

    std::fs::remove_file(path).ok();
}

#[test]
fn test_invalid_endpoint_is_rejected() {
    let path = write_settings(
        r#"{
            "authorization_endpoint": "not a url",
            "token_endpoint": "https://idp.example.com/token",
            "client_id": "app",
            "redirect_uri": "https://app.example.com/callback"
        }"#,
        "json",
    );

    let result = config::load_from_file(Some(path.clone()));
    assert!(result.is_err(), "Invalid endpoint URL should be rejected");

    std::fs::remove_file(path).ok();
}
