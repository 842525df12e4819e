//! Mock implementations of the session manager seams
//!
//! Provides mock objects for testing purposes. None of them touch the
//! network.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use portcullis_domain::{AuthError, AuthResult, ProviderConfig, TokenResponse};
use serde_json::{Map, Value};

use crate::auth::{EphemeralStorage, Navigator, OidcClientTrait};

/// Recorded revocation call: access token and optional refresh token
pub type RevocationCall = (String, Option<String>);

/// Mock OIDC client that serves queued responses and counts calls
///
/// Exchange and refresh responses are consumed in FIFO order; once a queue
/// is empty the call fails with `invalid_grant`. UserInfo returns the
/// configured document or `UserInfoUnavailable`.
///
/// # Examples
///
/// ```
/// use portcullis_common::testing::{fixtures, MockOidcClient};
///
/// let client = MockOidcClient::new(fixtures::provider_config("https://idp.example.com"));
/// assert_eq!(client.exchange_calls(), 0);
/// ```
#[derive(Debug)]
pub struct MockOidcClient {
    config: ProviderConfig,
    exchange_responses: Mutex<VecDeque<AuthResult<TokenResponse>>>,
    refresh_responses: Mutex<VecDeque<AuthResult<TokenResponse>>>,
    userinfo: Mutex<Option<Map<String, Value>>>,
    refresh_delay: Mutex<Option<Duration>>,
    exchange_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    userinfo_calls: AtomicUsize,
    revocations: Mutex<Vec<RevocationCall>>,
    last_verifier: Mutex<Option<String>>,
}

impl MockOidcClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            exchange_responses: Mutex::new(VecDeque::new()),
            refresh_responses: Mutex::new(VecDeque::new()),
            userinfo: Mutex::new(None),
            refresh_delay: Mutex::new(None),
            exchange_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            userinfo_calls: AtomicUsize::new(0),
            revocations: Mutex::new(Vec::new()),
            last_verifier: Mutex::new(None),
        }
    }

    /// Queue the result of the next code exchange.
    pub fn push_exchange_response(&self, response: AuthResult<TokenResponse>) {
        self.exchange_responses.lock().push_back(response);
    }

    /// Queue the result of the next refresh grant.
    pub fn push_refresh_response(&self, response: AuthResult<TokenResponse>) {
        self.refresh_responses.lock().push_back(response);
    }

    /// Serve this document from UserInfo; `None` makes UserInfo fail.
    pub fn set_userinfo(&self, userinfo: Option<Map<String, Value>>) {
        *self.userinfo.lock() = userinfo;
    }

    /// Delay refresh responses, to hold a refresh in flight.
    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock() = Some(delay);
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn userinfo_calls(&self) -> usize {
        self.userinfo_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn revocations(&self) -> Vec<RevocationCall> {
        self.revocations.lock().clone()
    }

    /// Verifier sent with the most recent code exchange
    #[must_use]
    pub fn last_verifier(&self) -> Option<String> {
        self.last_verifier.lock().clone()
    }
}

#[async_trait]
impl OidcClientTrait for MockOidcClient {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn exchange_code(&self, _code: &str, verifier: &str) -> AuthResult<TokenResponse> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_verifier.lock() = Some(verifier.to_string());

        let next = self.exchange_responses.lock().pop_front();
        next.unwrap_or_else(|| {
            Err(AuthError::token_exchange("invalid_grant", Some("no response queued".into())))
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> AuthResult<TokenResponse> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.refresh_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.refresh_responses.lock().pop_front();
        next.unwrap_or_else(|| Err(AuthError::RefreshFailed("invalid_grant".to_string())))
    }

    async fn revoke(&self, access_token: &str, refresh_token: Option<&str>) {
        self.revocations
            .lock()
            .push((access_token.to_string(), refresh_token.map(str::to_string)));
    }

    async fn fetch_userinfo(&self, _access_token: &str) -> AuthResult<Map<String, Value>> {
        self.userinfo_calls.fetch_add(1, Ordering::SeqCst);
        self.userinfo
            .lock()
            .clone()
            .ok_or_else(|| AuthError::UserInfoUnavailable("mock userinfo unavailable".to_string()))
    }
}

/// Navigator that records every destination instead of leaving the page
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<String> {
        self.visited.lock().last().cloned()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.visited.lock().len()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.visited.lock().push(url.to_string());
    }
}

/// Storage that rejects every write
#[derive(Debug, Default)]
pub struct FailingStorage;

impl EphemeralStorage for FailingStorage {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, key: &str, _value: &str) -> AuthResult<()> {
        Err(AuthError::Storage(format!("write to {key} rejected")))
    }

    fn remove(&self, _key: &str) {}
}
