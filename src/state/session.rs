//! Authenticated session for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every backend call goes through this store: sign-in (`/auth/login`,
//! `/auth/register`), replay of a stored credential (`/auth/me`), and
//! arbitrary authenticated requests. It owns the only copy of the bearer
//! credential and keeps the durable `token` key in step with memory.
//!
//! STATE MACHINE
//! =============
//! `Uninitialized -> Validating -> (Authenticated | Anonymous)`. Sign-in
//! moves Anonymous -> Authenticated; logout, failed validation, and a 401
//! from any authenticated call move Authenticated -> Anonymous.
//!
//! CONCURRENCY
//! ===========
//! Session fields sit behind a `tokio::sync::RwLock` that is never held
//! across a network await. Two guards keep overlapping calls coherent:
//!
//! - an epoch counter, advanced whenever the credential changes (an applied
//!   sign-in or a clear). A sign-in or validation response is applied only
//!   if the epoch is unchanged since its request left, so nothing
//!   resurrects a session after logout. A failed sign-in leaves the epoch
//!   alone and cannot strand a pending validation.
//! - an attempt counter, advanced by every sign-in attempt. Only the
//!   last-issued attempt may apply its response.
//! - a 401 clears the session only if the credential it was sent with is
//!   still current, so concurrent 401s sign out exactly once.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{RwLock, broadcast};

use crate::net::transport::{HttpRequest, HttpTransport, Method, default_headers, merge_headers, resolve_url};
use crate::net::types::{AuthOutcome, AuthResponse, ErrorBody, LoginRequest, MeResponse, RegisterRequest, User};
use crate::storage::{KeyValueStore, TOKEN_KEY};

pub const LOGIN_FAILED: &str = "login failed";
pub const REGISTER_FAILED: &str = "registration failed";
pub const CONNECTION_FAILED: &str = "connection error";
pub const REQUEST_FAILED: &str = "request failed";
pub const SUPERSEDED: &str = "superseded by a newer sign-in attempt";

const EVENT_CAPACITY: usize = 32;

// =============================================================================
// ERROR
// =============================================================================

/// Failure of an authenticated request.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No response was obtained.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend answered 401; the session has been cleared.
    #[error("session expired")]
    SessionExpired,

    /// Any other non-success status, with the server's message when it sent one.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// A success response whose body was not JSON.
    #[error("invalid response body: {0}")]
    Decode(String),
}

// =============================================================================
// STATUS / EVENTS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Validating,
    Authenticated,
    Anonymous,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignOutReason {
    Logout,
    ValidationFailed,
    Expired,
}

/// Broadcast on every transition into or out of `Authenticated`.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    SignedIn { user: User },
    SignedOut { reason: SignOutReason },
}

// =============================================================================
// REQUEST OPTIONS
// =============================================================================

/// Caller-chosen parts of an authenticated request.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    /// Applied after the defaults; same-named defaults are replaced.
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { method: Method::GET, headers: Vec::new(), body: None }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn post(body: Value) -> Self {
        Self { method: Method::POST, headers: Vec::new(), body: Some(body) }
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

// =============================================================================
// STORE
// =============================================================================

struct SessionInner {
    status: SessionStatus,
    user: Option<User>,
    token: Option<String>,
    epoch: u64,
    attempt: u64,
}

enum ClearIf<'a> {
    Always,
    EpochIs(u64),
    TokenIs(&'a str),
}

pub struct SessionStore {
    transport: Arc<dyn HttpTransport>,
    storage: Arc<dyn KeyValueStore>,
    base_url: String,
    inner: RwLock<SessionInner>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// An empty, `Uninitialized` store. Call [`SessionStore::initialize`]
    /// (or use [`SessionStore::restore`]) before handing it out.
    pub fn new(transport: Arc<dyn HttpTransport>, storage: Arc<dyn KeyValueStore>, base_url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            storage,
            base_url: crate::config::normalize_base_url(&base_url.into()),
            inner: RwLock::new(SessionInner {
                status: SessionStatus::Uninitialized,
                user: None,
                token: None,
                epoch: 0,
                attempt: 0,
            }),
            events,
        }
    }

    /// Build a store and replay any stored credential. Returns once the
    /// store is `Authenticated` or `Anonymous`.
    pub async fn restore(
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn KeyValueStore>,
        base_url: impl Into<String>,
    ) -> Self {
        let store = Self::new(transport, storage, base_url);
        store.initialize().await;
        store
    }

    /// Load the stored credential and validate it.
    pub async fn initialize(&self) {
        let stored = match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "stored credential unreadable; starting anonymous");
                None
            }
        };
        {
            let mut inner = self.inner.write().await;
            inner.token = stored;
        }
        self.validate_session().await;
    }

    /// Replay the current credential against `GET /auth/me`. Any failure
    /// clears the session.
    pub async fn validate_session(&self) {
        let (token, epoch) = {
            let mut inner = self.inner.write().await;
            match inner.token.clone() {
                Some(token) => {
                    if inner.status != SessionStatus::Authenticated {
                        inner.status = SessionStatus::Validating;
                    }
                    (token, inner.epoch)
                }
                None => {
                    inner.user = None;
                    inner.status = SessionStatus::Anonymous;
                    return;
                }
            }
        };

        let request = HttpRequest {
            method: Method::GET,
            url: resolve_url(&self.base_url, "/auth/me"),
            headers: default_headers(Some(&token)),
            body: None,
        };
        let validated = match self.transport.send(request).await {
            Ok(response) if response.is_success() => serde_json::from_str::<MeResponse>(&response.body)
                .map(|me| me.user)
                .map_err(|e| format!("undecodable /auth/me body: {e}")),
            Ok(response) => Err(format!("/auth/me returned {}", response.status)),
            Err(e) => Err(e.to_string()),
        };

        match validated {
            Ok(user) => {
                let newly_signed_in = {
                    let mut inner = self.inner.write().await;
                    if inner.epoch != epoch {
                        return;
                    }
                    let was = inner.status;
                    inner.user = Some(user.clone());
                    inner.status = SessionStatus::Authenticated;
                    was != SessionStatus::Authenticated
                };
                tracing::info!(user = %user.id, "session validated");
                if newly_signed_in {
                    let _ = self.events.send(SessionEvent::SignedIn { user });
                }
            }
            Err(reason) => {
                tracing::warn!(%reason, "session validation failed");
                self.clear(ClearIf::EpochIs(epoch), SignOutReason::ValidationFailed).await;
            }
        }
    }

    /// Sign in with email and password via `POST /auth/login`.
    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome {
        let body = serde_json::to_value(LoginRequest { email, password });
        self.sign_in("/auth/login", body, LOGIN_FAILED).await
    }

    /// Create an account via `POST /auth/register` and sign in with it.
    pub async fn register(&self, email: &str, password: &str, name: &str, phone: Option<&str>) -> AuthOutcome {
        let body = serde_json::to_value(RegisterRequest { email, password, name, phone });
        self.sign_in("/auth/register", body, REGISTER_FAILED).await
    }

    /// Drop identity and credential from memory and storage. Idempotent.
    pub async fn logout(&self) {
        self.clear(ClearIf::Always, SignOutReason::Logout).await;
    }

    /// Replace the in-memory profile after an edit. Ignored when anonymous.
    pub async fn update_user(&self, user: User) {
        let mut inner = self.inner.write().await;
        if inner.status == SessionStatus::Authenticated {
            inner.user = Some(user);
        }
    }

    /// Send `endpoint` with the current credential attached and decode the
    /// JSON body. `endpoint` is relative to the API base unless it is an
    /// absolute `http(s)://` URL.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Connection`] if no response arrived
    /// - [`SessionError::SessionExpired`] on 401, after clearing the session
    /// - [`SessionError::Server`] on any other non-2xx
    /// - [`SessionError::Decode`] if a 2xx body is not JSON
    pub async fn authenticated_request(&self, endpoint: &str, options: RequestOptions) -> Result<Value, SessionError> {
        let token = self.inner.read().await.token.clone();
        let request = HttpRequest {
            method: options.method,
            url: resolve_url(&self.base_url, endpoint),
            headers: merge_headers(default_headers(token.as_deref()), &options.headers),
            body: options.body,
        };
        tracing::debug!(method = %request.method, url = %request.url, "authenticated request");

        let response = self.transport.send(request).await.map_err(|e| {
            tracing::warn!(error = %e, %endpoint, "request failed to reach backend");
            SessionError::Connection(e.to_string())
        })?;

        if response.status == 401 {
            if let Some(token) = token.as_deref() {
                self.clear(ClearIf::TokenIs(token), SignOutReason::Expired).await;
            }
            return Err(SessionError::SessionExpired);
        }
        if !response.is_success() {
            let message = ErrorBody::message_from(&response.body).unwrap_or_else(|| REQUEST_FAILED.to_owned());
            tracing::warn!(status = response.status, %endpoint, %message, "backend rejected request");
            return Err(SessionError::Server { status: response.status, message });
        }
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| SessionError::Decode(e.to_string()))
    }

    pub async fn current_user(&self) -> Option<User> {
        self.inner.read().await.user.clone()
    }

    /// The bearer credential, if signed in.
    pub async fn token(&self) -> Option<String> {
        self.inner.read().await.token.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.read().await.status
    }

    pub async fn is_authenticated(&self) -> bool {
        self.status().await == SessionStatus::Authenticated
    }

    /// Receive future [`SessionEvent`]s.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    async fn sign_in(&self, path: &str, body: Result<Value, serde_json::Error>, fallback: &str) -> AuthOutcome {
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, %path, "sign-in body not serializable");
                return AuthOutcome::Failure { error: fallback.to_owned() };
            }
        };
        let (attempt, epoch) = {
            let mut inner = self.inner.write().await;
            inner.attempt += 1;
            (inner.attempt, inner.epoch)
        };

        let request = HttpRequest {
            method: Method::POST,
            url: resolve_url(&self.base_url, path),
            headers: default_headers(None),
            body: Some(body),
        };
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, %path, "sign-in could not reach backend");
                return AuthOutcome::Failure { error: CONNECTION_FAILED.to_owned() };
            }
        };

        if !response.is_success() {
            let error = ErrorBody::message_from(&response.body).unwrap_or_else(|| fallback.to_owned());
            tracing::info!(status = response.status, %path, %error, "sign-in rejected");
            return AuthOutcome::Failure { error };
        }
        let auth: AuthResponse = match serde_json::from_str(&response.body) {
            Ok(auth) => auth,
            Err(e) => {
                tracing::warn!(error = %e, %path, "sign-in response undecodable");
                return AuthOutcome::Failure { error: fallback.to_owned() };
            }
        };

        {
            let mut inner = self.inner.write().await;
            if inner.attempt != attempt || inner.epoch != epoch {
                tracing::info!(%path, "discarding superseded sign-in response");
                return AuthOutcome::Failure { error: SUPERSEDED.to_owned() };
            }
            if let Err(e) = self.storage.set(TOKEN_KEY, &auth.access_token) {
                tracing::warn!(error = %e, "credential not persisted; session lasts for this process only");
            }
            inner.user = Some(auth.user.clone());
            inner.token = Some(auth.access_token);
            inner.status = SessionStatus::Authenticated;
            inner.epoch += 1;
        }

        tracing::info!(user = %auth.user.id, %path, "signed in");
        let _ = self.events.send(SessionEvent::SignedIn { user: auth.user.clone() });
        AuthOutcome::Success { user: auth.user }
    }

    /// Clear the session if `condition` still holds. Storage is updated
    /// under the same lock so memory and disk cannot diverge.
    async fn clear(&self, condition: ClearIf<'_>, reason: SignOutReason) -> bool {
        let had_session = {
            let mut inner = self.inner.write().await;
            let holds = match condition {
                ClearIf::Always => true,
                ClearIf::EpochIs(epoch) => inner.epoch == epoch,
                ClearIf::TokenIs(token) => inner.token.as_deref() == Some(token),
            };
            if !holds {
                return false;
            }
            let had_session = inner.token.is_some() || inner.user.is_some();
            inner.user = None;
            inner.token = None;
            inner.status = SessionStatus::Anonymous;
            inner.epoch += 1;
            if let Err(e) = self.storage.remove(TOKEN_KEY) {
                tracing::warn!(error = %e, "stored credential could not be removed");
            }
            had_session
        };

        if had_session {
            tracing::info!(?reason, "signed out");
            let _ = self.events.send(SessionEvent::SignedOut { reason });
        }
        had_session
    }
}
