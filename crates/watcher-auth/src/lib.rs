#![warn(missing_docs)]
//! # watcher-auth
//!
//! ## Purpose
//! Wraps the delegated auth provider: account sign-up/sign-in, session
//! lifecycle, and profile bootstrap.
//!
//! ## Responsibilities
//! - Validate the auth endpoint policy (HTTPS, `/auth` path).
//! - Execute sign-up/sign-in requests through an injectable transport.
//! - Model session expiry transitions used to gate history access.
//! - Upsert the user profile if absent after first sign-in.
//!
//! ## Data flow
//! UI collects credentials -> [`AuthClient::sign_in`] sends the request
//! through [`AuthTransport`] -> receives [`SessionToken`] ->
//! [`SessionStateMachine`] tracks validity; expired sessions fall back to
//! demo/local data instead of crashing.
//!
//! ## Ownership and lifetimes
//! Token/session values are owned (`String`) to decouple transport and
//! runtime state machine lifetimes.
//!
//! ## Error model
//! Endpoint policy violations and transport failures surface as
//! [`AuthError`]; a missing or expired session is a state, never a panic.
//!
//! ## Security and privacy notes
//! This crate does not log credentials or token values. Callers are expected
//! to keep credential inputs ephemeral.
//!
//! ## Example
//! ```rust
//! use watcher_auth::{SessionState, SessionStateMachine};
//!
//! let machine = SessionStateMachine::new();
//! assert!(matches!(machine.state(), SessionState::SignedOut));
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Required auth path prefix.
pub const REQUIRED_AUTH_PATH: &str = "/auth";

/// User-provided account credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account email address.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Sign-up request payload forwarded to the auth transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpRequest {
    /// Email address for the new account.
    pub email: String,
    /// Password for the new account.
    pub password: String,
    /// Optional display name stored on the profile.
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Sign-in request payload forwarded to the auth transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInRequest {
    /// Account email address.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Auth provider response for sign-up/sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Access token used for protected API calls.
    pub access_token: String,
    /// Refresh token for session renewal (opaque to this crate).
    #[serde(default)]
    pub refresh_token: String,
    /// Provider-issued user identifier.
    pub user_id: String,
    /// Lifetime duration in seconds.
    pub expires_in_seconds: u64,
}

/// Session token with absolute expiry timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    /// Bearer token forwarded to the detection history endpoint.
    pub access_token: String,
    /// User identifier the session belongs to.
    pub user_id: String,
    /// Absolute epoch milliseconds when the token expires.
    pub expires_at_ms: u64,
}

impl SessionToken {
    /// Returns `true` when the token has expired at `now_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// Runtime session state used by history-access gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No valid session exists.
    SignedOut,
    /// Session is currently valid.
    SignedIn(SessionToken),
    /// Session expired; the caller should redirect to login or fall back to
    /// local data.
    Expired,
}

/// Session state machine with explicit legal transitions.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    state: SessionState,
}

impl SessionStateMachine {
    /// Creates a new state machine in `SignedOut` state.
    pub fn new() -> Self {
        Self {
            state: SessionState::SignedOut,
        }
    }

    /// Returns the current session state snapshot.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Applies a successful sign-in transition.
    pub fn on_sign_in(&mut self, token: SessionToken) {
        self.state = SessionState::SignedIn(token);
    }

    /// Re-evaluates state based on token expiry.
    pub fn on_tick(&mut self, now_ms: u64) {
        if let SessionState::SignedIn(token) = &self.state
            && token.is_expired(now_ms)
        {
            self.state = SessionState::Expired;
        }
    }

    /// Explicit sign-out transition.
    pub fn sign_out(&mut self) {
        self.state = SessionState::SignedOut;
    }

    /// Returns the access token while the session is valid.
    pub fn access_token(&self, now_ms: u64) -> Option<&str> {
        match &self.state {
            SessionState::SignedIn(token) if !token.is_expired(now_ms) => {
                Some(token.access_token.as_str())
            }
            _ => None,
        }
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a profile upsert-if-absent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOutcome {
    /// Profile row was created on this call.
    Created,
    /// Profile row already existed; nothing was written.
    AlreadyExists,
}

/// Abstract transport used by the auth client.
pub trait AuthTransport: Send + Sync {
    /// Registers a new account.
    fn sign_up(&self, endpoint: &str, request: &SignUpRequest) -> Result<AuthResponse, AuthError>;

    /// Signs an existing account in.
    fn sign_in(&self, endpoint: &str, request: &SignInRequest) -> Result<AuthResponse, AuthError>;

    /// Invalidates the current session server-side.
    fn sign_out(&self, endpoint: &str, access_token: &str) -> Result<(), AuthError>;

    /// Creates the user's profile row when it does not exist yet.
    fn upsert_profile(
        &self,
        endpoint: &str,
        access_token: &str,
        full_name: Option<&str>,
    ) -> Result<ProfileOutcome, AuthError>;
}

/// Auth client that validates endpoint policy and executes the account flow.
#[derive(Clone)]
pub struct AuthClient {
    endpoint: String,
    transport: Arc<dyn AuthTransport>,
}

impl AuthClient {
    /// Creates a validated auth client.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidEndpoint`] when the URL is not HTTPS or
    /// does not include the required `/auth` path.
    pub fn new(
        endpoint: impl Into<String>,
        transport: Arc<dyn AuthTransport>,
    ) -> Result<Self, AuthError> {
        let endpoint = endpoint.into();
        validate_auth_endpoint(&endpoint)?;
        Ok(Self {
            endpoint,
            transport,
        })
    }

    /// Registers an account and converts the response into a session token.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredential`] for blank or malformed
    /// credentials; propagates transport errors for caller retry/prompt
    /// behavior.
    pub fn sign_up(
        &self,
        credentials: &Credentials,
        full_name: Option<&str>,
        now_ms: u64,
    ) -> Result<SessionToken, AuthError> {
        validate_credentials(credentials)?;

        let response = self.transport.sign_up(
            &self.endpoint,
            &SignUpRequest {
                email: credentials.email.clone(),
                password: credentials.password.clone(),
                full_name: full_name.map(str::to_string),
            },
        )?;

        session_from_response(response, now_ms)
    }

    /// Signs in and converts the response into a session token.
    ///
    /// # Errors
    /// Same surface as [`AuthClient::sign_up`].
    pub fn sign_in(
        &self,
        credentials: &Credentials,
        now_ms: u64,
    ) -> Result<SessionToken, AuthError> {
        validate_credentials(credentials)?;

        let response = self.transport.sign_in(
            &self.endpoint,
            &SignInRequest {
                email: credentials.email.clone(),
                password: credentials.password.clone(),
            },
        )?;

        session_from_response(response, now_ms)
    }

    /// Signs the session out server-side.
    ///
    /// # Errors
    /// Propagates transport failures; callers discard local state regardless.
    pub fn sign_out(&self, token: &SessionToken) -> Result<(), AuthError> {
        self.transport.sign_out(&self.endpoint, &token.access_token)
    }

    /// Creates the signed-in user's profile when absent.
    ///
    /// # Errors
    /// Propagates transport failures; a pre-existing profile is a success.
    pub fn ensure_profile(
        &self,
        token: &SessionToken,
        full_name: Option<&str>,
    ) -> Result<ProfileOutcome, AuthError> {
        self.transport
            .upsert_profile(&self.endpoint, &token.access_token, full_name)
    }

    /// Returns the configured auth endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn validate_credentials(credentials: &Credentials) -> Result<(), AuthError> {
    if credentials.email.trim().is_empty() || credentials.password.trim().is_empty() {
        return Err(AuthError::InvalidCredential(
            "email and password must be non-empty".to_string(),
        ));
    }

    if !credentials.email.contains('@') {
        return Err(AuthError::InvalidCredential(
            "email address is malformed".to_string(),
        ));
    }

    Ok(())
}

fn session_from_response(response: AuthResponse, now_ms: u64) -> Result<SessionToken, AuthError> {
    if response.access_token.trim().is_empty() || response.user_id.trim().is_empty() {
        return Err(AuthError::InvalidResponse(
            "response missing token or user id".to_string(),
        ));
    }

    let expires_at_ms = now_ms.saturating_add(response.expires_in_seconds.saturating_mul(1_000));

    Ok(SessionToken {
        access_token: response.access_token,
        user_id: response.user_id,
        expires_at_ms,
    })
}

/// Validates auth endpoint constraints.
///
/// # Errors
/// Returns [`AuthError::InvalidEndpoint`] for non-HTTPS URLs or path
/// mismatches.
pub fn validate_auth_endpoint(endpoint: &str) -> Result<(), AuthError> {
    let parsed = Url::parse(endpoint)
        .map_err(|error| AuthError::InvalidEndpoint(format!("invalid auth url: {error}")))?;

    if parsed.scheme() != "https" {
        return Err(AuthError::InvalidEndpoint(
            "auth endpoint must use https".to_string(),
        ));
    }

    if !parsed.path().starts_with(REQUIRED_AUTH_PATH) {
        return Err(AuthError::InvalidEndpoint(format!(
            "auth endpoint path must start with {REQUIRED_AUTH_PATH}"
        )));
    }

    Ok(())
}

/// Errors produced by auth client/state logic.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Endpoint violates security or contract requirements.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Credentials are missing or malformed.
    #[error("invalid credentials: {0}")]
    InvalidCredential(String),
    /// Transport failure from the auth provider.
    #[error("auth transport failure: {0}")]
    Transport(String),
    /// Response payload violated auth contract expectations.
    #[error("invalid auth response: {0}")]
    InvalidResponse(String),
}
