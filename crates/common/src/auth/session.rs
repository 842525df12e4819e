//! Session lifecycle manager
//!
//! Owns the single authoritative [`Session`] and drives it through
//! `Anonymous → LoggingIn → Authenticated → Refreshing → Authenticated |
//! Anonymous`. Subscribers observe state changes through a watch channel.
//!
//! # Locking
//!
//! - `session` is a synchronous lock and is never held across an `.await`,
//!   so authorization queries never wait on network I/O.
//! - `refresh_guard` serializes refresh grants. A caller that waited on it
//!   sees the generation counter moved and returns without a second grant.
//! - `session_epoch` changes, under the `session` write lock, whenever the
//!   session is replaced or reset. A refresh commits only if the epoch it
//!   started from is still current.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use portcullis_domain::constants::{
    DEFAULT_EXPIRY_BUFFER_SECS, DEFAULT_MONITOR_INTERVAL_SECS, STORAGE_KEY_OAUTH_STATE,
    STORAGE_KEY_PKCE_VERIFIER, STORAGE_KEY_RETURN_PATH,
};
use portcullis_domain::{
    AuthError, AuthResult, IdentityClaims, Session, SessionState, TokenResponse, UserProfile,
};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use url::Url;

use super::client::OidcClient;
use super::monitor::{self, MonitorHandle};
use super::permissions::{check_access, AccessDecision, Permissions, RouteRequirement};
use super::storage::MemoryStorage;
use super::traits::{EphemeralStorage, Navigator, OidcClientTrait};
use super::{claims, pkce, token};
use crate::time::{Clock, SystemClock};

/// Result of a refresh attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New tokens are in place
    Refreshed,
    /// Refresh was impossible or failed; the session was ended
    LoggedOut,
    /// There was no authenticated session to refresh
    NotAuthenticated,
}

/// Builder for [`SessionManager`]
pub struct SessionManagerBuilder<C> {
    client: Arc<C>,
    navigator: Arc<dyn Navigator>,
    storage: Option<Arc<dyn EphemeralStorage>>,
    clock: Option<Arc<dyn Clock>>,
    monitor_interval: Duration,
    expiry_buffer_secs: i64,
}

impl<C: OidcClientTrait + 'static> SessionManagerBuilder<C> {
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn EphemeralStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Interval between expiry checks (default 60 s)
    #[must_use]
    pub fn monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// How long before identity token expiry a refresh is triggered
    /// (default 5 minutes)
    #[must_use]
    pub fn expiry_buffer_secs(mut self, secs: i64) -> Self {
        self.expiry_buffer_secs = secs;
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<SessionManager<C>> {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Arc::new_cyclic(|this| SessionManager {
            this: this.clone(),
            client: self.client,
            storage: self.storage.unwrap_or_else(|| Arc::new(MemoryStorage::new())),
            navigator: self.navigator,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            session: RwLock::new(Session::anonymous()),
            state,
            refresh_guard: tokio::sync::Mutex::new(()),
            refresh_generation: AtomicU64::new(0),
            session_epoch: AtomicU64::new(0),
            monitor: Mutex::new(None),
            monitor_interval: self.monitor_interval,
            expiry_buffer_secs: self.expiry_buffer_secs,
        })
    }
}

/// Owner of the authenticated session
pub struct SessionManager<C = OidcClient> {
    this: Weak<Self>,
    client: Arc<C>,
    storage: Arc<dyn EphemeralStorage>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    session: RwLock<Session>,
    state: watch::Sender<SessionState>,
    refresh_guard: tokio::sync::Mutex<()>,
    refresh_generation: AtomicU64,
    session_epoch: AtomicU64,
    monitor: Mutex<Option<MonitorHandle>>,
    monitor_interval: Duration,
    expiry_buffer_secs: i64,
}

impl<C: OidcClientTrait + 'static> SessionManager<C> {
    /// Start building a manager around `client`; `navigator` performs the
    /// full-page redirects.
    #[must_use]
    pub fn builder(client: Arc<C>, navigator: Arc<dyn Navigator>) -> SessionManagerBuilder<C> {
        SessionManagerBuilder {
            client,
            navigator,
            storage: None,
            clock: None,
            monitor_interval: Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS),
            expiry_buffer_secs: DEFAULT_EXPIRY_BUFFER_SECS,
        }
    }

    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    // ------------------------------------------------------------------
    // Login
    // ------------------------------------------------------------------

    /// Begin the authorization code flow
    ///
    /// # Errors
    /// Returns error if randomness, URL construction or storage fails; in
    /// that case nothing is navigated.
    pub fn login(&self) -> AuthResult<Url> {
        self.login_with_return_path(None)
    }

    /// Begin the authorization code flow, remembering where to return after
    /// the callback completes.
    ///
    /// # Errors
    /// Returns error if randomness, URL construction or storage fails.
    pub fn login_with_return_path(&self, return_path: Option<&str>) -> AuthResult<Url> {
        let pair = pkce::generate_challenge_pair()?;
        let state = pkce::generate_state()?;
        let url = self.client.authorization_url(&pair.challenge, &state)?;

        self.storage.set(STORAGE_KEY_PKCE_VERIFIER, &pair.verifier)?;
        self.storage.set(STORAGE_KEY_OAUTH_STATE, &state)?;
        if let Some(path) = return_path.filter(|p| !p.is_empty()) {
            self.storage.set(STORAGE_KEY_RETURN_PATH, path)?;
        }

        self.transition(SessionState::LoggingIn);
        info!(
            endpoint = %self.client.config().authorization_endpoint,
            "redirecting to authorization endpoint"
        );
        self.navigator.navigate(url.as_str());
        Ok(url)
    }

    /// Complete login from the full redirect URL
    ///
    /// Checks the provider `error` parameter, the presence of `code` and the
    /// stored `state` before delegating to [`Self::handle_callback`].
    ///
    /// # Errors
    /// `AuthorizationDenied`, `MissingAuthorizationCode`, `StateMismatch`, or
    /// any error from [`Self::handle_callback`].
    pub async fn handle_redirect(&self, callback: &Url) -> AuthResult<UserProfile> {
        let mut code = None;
        let mut returned_state = None;
        let mut provider_error = None;
        let mut error_description = None;
        for (key, value) in callback.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => returned_state = Some(value.into_owned()),
                "error" => provider_error = Some(value.into_owned()),
                "error_description" => error_description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = provider_error {
            warn!(error = %error, "authorization request rejected by provider");
            self.abandon_login();
            return Err(AuthError::AuthorizationDenied { error, description: error_description });
        }

        let Some(code) = code.filter(|c| !c.is_empty()) else {
            self.abandon_login();
            return Err(AuthError::MissingAuthorizationCode);
        };

        if let Some(expected) = self.storage.get(STORAGE_KEY_OAUTH_STATE) {
            let matches =
                returned_state.as_deref().is_some_and(|got| pkce::validate_state(&expected, got));
            if !matches {
                warn!("authorization callback state does not match the stored value");
                self.abandon_login();
                return Err(AuthError::StateMismatch);
            }
        }

        self.handle_callback(&code).await
    }

    /// Exchange `code` for tokens and establish the session
    ///
    /// # Errors
    /// - `MissingVerifier` when no verifier is stored (no request is made)
    /// - exchange, decode or validation errors; the session is left
    ///   `Anonymous` and the stored verifier and state are cleared
    pub async fn handle_callback(&self, code: &str) -> AuthResult<UserProfile> {
        let Some(verifier) = self.storage.get(STORAGE_KEY_PKCE_VERIFIER) else {
            warn!("authorization callback received without a stored PKCE verifier");
            if !self.is_authenticated() {
                self.transition(SessionState::Anonymous);
            }
            return Err(AuthError::MissingVerifier);
        };

        let result = self.complete_login(code, &verifier).await;
        self.storage.remove(STORAGE_KEY_PKCE_VERIFIER);
        self.storage.remove(STORAGE_KEY_OAUTH_STATE);

        match result {
            Ok(profile) => {
                info!(sub = %profile.id, "login complete");
                self.transition(SessionState::Authenticated);
                self.start_monitoring();
                Ok(profile)
            }
            Err(err) => {
                error!(error = %err, "login failed");
                self.stop_monitoring();
                self.reset_session();
                Err(err)
            }
        }
    }

    async fn complete_login(&self, code: &str, verifier: &str) -> AuthResult<UserProfile> {
        let tokens = self.client.exchange_code(code, verifier).await?;
        let id_token = tokens.id_token.clone().ok_or_else(|| {
            AuthError::InvalidFormat("token response did not include an id_token".to_string())
        })?;

        let identity = token::decode(&id_token)?;
        token::validate(&identity, self.client.config(), self.clock.unix_timestamp())?;

        let profile = self.load_profile(&tokens.access_token, &identity).await;
        let expires_at = self.expiry_of(&tokens, &identity);

        let mut session = self.session.write();
        self.session_epoch.fetch_add(1, Ordering::AcqRel);
        *session = Session {
            authenticated: true,
            access_token: Some(tokens.access_token),
            id_token: Some(id_token),
            refresh_token: tokens.refresh_token,
            identity_claims: Some(identity),
            profile: Some(profile.clone()),
            expires_at: Some(expires_at),
        };
        drop(session);

        Ok(profile)
    }

    fn abandon_login(&self) {
        self.storage.remove(STORAGE_KEY_PKCE_VERIFIER);
        self.storage.remove(STORAGE_KEY_OAUTH_STATE);
        if !self.is_authenticated() {
            self.transition(SessionState::Anonymous);
        }
    }

    async fn load_profile(&self, access_token: &str, identity: &IdentityClaims) -> UserProfile {
        let config = self.client.config();
        let userinfo: Option<Map<String, Value>> = if config.userinfo_endpoint.is_some() {
            match self.client.fetch_userinfo(access_token).await {
                Ok(info) => Some(info),
                Err(err) => {
                    warn!(error = %err, "UserInfo unavailable; using identity token claims only");
                    None
                }
            }
        } else {
            None
        };

        claims::build_profile(
            identity,
            userinfo.as_ref(),
            &config.roles_claim,
            &config.permissions_claim,
        )
    }

    /// Access token expiry from `expires_in`, falling back to the identity
    /// token `exp` when the provider omits it.
    fn expiry_of(&self, tokens: &TokenResponse, identity: &IdentityClaims) -> DateTime<Utc> {
        let now = self.clock.now();
        if tokens.expires_in > 0 {
            return now + chrono::Duration::seconds(tokens.expires_in);
        }
        identity.exp.and_then(|exp| DateTime::from_timestamp(exp, 0)).unwrap_or(now)
    }

    // ------------------------------------------------------------------
    // Refresh and monitoring
    // ------------------------------------------------------------------

    /// One monitor tick: refresh when the identity token is inside the
    /// expiry buffer. Returns `None` when no refresh was needed.
    pub async fn check_expiry(&self) -> Option<RefreshOutcome> {
        let needs_refresh = {
            let session = self.session.read();
            session.authenticated
                && session.id_token.as_deref().map_or(true, |id_token| {
                    token::is_token_expired(
                        id_token,
                        self.expiry_buffer_secs,
                        self.clock.unix_timestamp(),
                    )
                })
        };

        if !needs_refresh {
            return None;
        }

        debug!("identity token inside expiry buffer; refreshing");
        Some(self.refresh_session().await)
    }

    /// Run the refresh grant
    ///
    /// Without a refresh token the session is ended locally, with no request
    /// to the provider. A failed grant ends it through [`Self::logout`]. If
    /// the session is reset while the grant is in flight, the new tokens are
    /// discarded.
    pub async fn refresh_session(&self) -> RefreshOutcome {
        let observed = self.refresh_generation.load(Ordering::Acquire);
        let _guard = self.refresh_guard.lock().await;

        if self.refresh_generation.load(Ordering::Acquire) != observed {
            debug!("refresh already completed by a concurrent caller");
            return if self.is_authenticated() {
                RefreshOutcome::Refreshed
            } else {
                RefreshOutcome::LoggedOut
            };
        }

        let (authenticated, refresh_token, epoch) = {
            let session = self.session.read();
            (
                session.authenticated,
                session.refresh_token.clone(),
                self.session_epoch.load(Ordering::Acquire),
            )
        };
        if !authenticated {
            return RefreshOutcome::NotAuthenticated;
        }

        let outcome = match refresh_token {
            None => {
                info!("no refresh token held; ending session");
                let id_token = self.session.read().id_token.clone();
                self.end_session(id_token.as_deref());
                RefreshOutcome::LoggedOut
            }
            Some(refresh_token) => {
                self.transition(SessionState::Refreshing);
                match self.perform_refresh(&refresh_token, epoch).await {
                    Ok(true) => {
                        info!("session refreshed");
                        RefreshOutcome::Refreshed
                    }
                    Ok(false) => {
                        info!("session ended while refreshing; discarding new tokens");
                        RefreshOutcome::LoggedOut
                    }
                    Err(err) if self.session_epoch.load(Ordering::Acquire) != epoch => {
                        debug!(error = %err, "refresh failed after the session had already ended");
                        RefreshOutcome::LoggedOut
                    }
                    Err(err) => {
                        error!(error = %err, "token refresh failed; ending session");
                        self.logout().await;
                        RefreshOutcome::LoggedOut
                    }
                }
            }
        };

        self.refresh_generation.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Returns `Ok(false)` when the session changed since `epoch` and the
    /// new tokens were not committed.
    async fn perform_refresh(&self, refresh_token: &str, epoch: u64) -> AuthResult<bool> {
        let tokens = self.client.refresh(refresh_token).await?;

        let (id_token, identity) = match tokens.id_token.clone() {
            Some(id_token) => {
                let identity = token::decode(&id_token)?;
                token::validate(&identity, self.client.config(), self.clock.unix_timestamp())?;
                (id_token, identity)
            }
            None => {
                debug!("refresh response carried no id_token; keeping the current one");
                let session = self.session.read();
                match (session.id_token.clone(), session.identity_claims.clone()) {
                    (Some(id_token), Some(identity)) => (id_token, identity),
                    _ => {
                        return Err(AuthError::RefreshFailed(
                            "no identity token available after refresh".to_string(),
                        ))
                    }
                }
            }
        };

        let profile = self.load_profile(&tokens.access_token, &identity).await;
        let expires_at = self.expiry_of(&tokens, &identity);

        let mut session = self.session.write();
        if self.session_epoch.load(Ordering::Acquire) != epoch || !session.authenticated {
            return Ok(false);
        }
        session.access_token = Some(tokens.access_token);
        session.id_token = Some(id_token);
        session.identity_claims = Some(identity);
        session.profile = Some(profile);
        session.expires_at = Some(expires_at);
        if let Some(rotated) = tokens.refresh_token {
            session.refresh_token = Some(rotated);
        }
        self.transition(SessionState::Authenticated);
        drop(session);
        Ok(true)
    }

    /// Start the expiry monitor, replacing any running one
    pub fn start_monitoring(&self) -> MonitorHandle {
        let this = self.this.clone();
        let handle = monitor::spawn(self.monitor_interval, move || {
            let this = this.clone();
            async move {
                let Some(manager) = this.upgrade() else {
                    return false;
                };
                manager.check_expiry().await;
                true
            }
        });

        if let Some(previous) = self.monitor.lock().replace(handle.clone()) {
            previous.cancel();
        }
        handle
    }

    pub fn stop_monitoring(&self) {
        if let Some(handle) = self.monitor.lock().take() {
            handle.cancel();
        }
    }

    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.monitor.lock().as_ref().is_some_and(|handle| !handle.is_cancelled())
    }

    // ------------------------------------------------------------------
    // Logout
    // ------------------------------------------------------------------

    /// End the session
    ///
    /// Revocation is best effort. Monitoring stops and local state is cleared
    /// regardless, then the host navigates to the provider logout URL or the
    /// configured post-logout destination.
    pub async fn logout(&self) {
        let (access_token, refresh_token, id_token) = {
            let session = self.session.read();
            (session.access_token.clone(), session.refresh_token.clone(), session.id_token.clone())
        };

        if let Some(access_token) = access_token.as_deref() {
            self.client.revoke(access_token, refresh_token.as_deref()).await;
        }

        self.end_session(id_token.as_deref());
    }

    /// Local half of logout: stop monitoring, clear the session and stored
    /// login state, then navigate away.
    fn end_session(&self, id_token: Option<&str>) {
        self.stop_monitoring();
        self.reset_session();
        for key in [STORAGE_KEY_PKCE_VERIFIER, STORAGE_KEY_OAUTH_STATE, STORAGE_KEY_RETURN_PATH] {
            self.storage.remove(key);
        }

        let destination = id_token
            .and_then(|id_token| self.client.end_session_url(id_token))
            .map_or_else(|| self.client.config().post_logout_redirect_uri.clone(), String::from);

        info!("logged out");
        self.navigator.navigate(&destination);
    }

    // ------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Snapshot of the current session
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    /// Authenticated and the access token has not expired by the clock
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        let session = self.session.read();
        session.authenticated && session.is_valid_at(self.clock.now())
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.session.read().access_token.clone()
    }

    #[must_use]
    pub fn id_token(&self) -> Option<String> {
        self.session.read().id_token.clone()
    }

    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        self.session.read().profile.clone()
    }

    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        self.with_permissions(|view| view.roles().to_vec())
    }

    #[must_use]
    pub fn permissions(&self) -> Vec<String> {
        self.with_permissions(|view| view.permissions().to_vec())
    }

    /// Remove and return the path recorded before login
    #[must_use]
    pub fn take_return_path(&self) -> Option<String> {
        let path = self.storage.get(STORAGE_KEY_RETURN_PATH)?;
        self.storage.remove(STORAGE_KEY_RETURN_PATH);
        Some(path)
    }

    // ------------------------------------------------------------------
    // Authorization queries
    // ------------------------------------------------------------------

    fn with_permissions<R>(&self, f: impl FnOnce(&Permissions<'_>) -> R) -> R {
        let session = self.session.read();
        let profile = if session.authenticated && session.is_valid_at(self.clock.now()) {
            session.profile.as_ref()
        } else {
            None
        };
        f(&Permissions::new(profile))
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.with_permissions(|view| view.has_role(role))
    }

    #[must_use]
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.with_permissions(|view| view.has_any_role(roles))
    }

    #[must_use]
    pub fn has_all_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.with_permissions(|view| view.has_all_roles(roles))
    }

    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.with_permissions(|view| view.has_permission(permission))
    }

    #[must_use]
    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        self.with_permissions(|view| view.has_any_permission(permissions))
    }

    #[must_use]
    pub fn has_all_permissions<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        self.with_permissions(|view| view.has_all_permissions(permissions))
    }

    /// Route guard: decide access and record the return path when login is
    /// required.
    pub fn authorize_route(&self, requirement: &RouteRequirement<'_>) -> AccessDecision {
        let decision = self.with_permissions(|view| check_access(requirement, view));

        if let AccessDecision::RequireLogin { return_path: Some(path) } = &decision {
            if let Err(err) = self.storage.set(STORAGE_KEY_RETURN_PATH, path) {
                warn!(error = %err, "could not record return path");
            }
        }
        decision
    }

    fn reset_session(&self) {
        let mut session = self.session.write();
        self.session_epoch.fetch_add(1, Ordering::AcqRel);
        *session = Session::anonymous();
        self.transition(SessionState::Anonymous);
        drop(session);
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(from = %previous, to = %next, "session state changed");
        }
    }
}

impl<C> Drop for SessionManager<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.monitor.get_mut().take() {
            handle.cancel();
        }
    }
}

impl<C> std::fmt::Debug for SessionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.state.borrow())
            .field("monitor_interval", &self.monitor_interval)
            .finish_non_exhaustive()
    }
}
