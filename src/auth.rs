//! Account session: login, registration, auto-login, and stored credentials.
//!
//! Credentials live in the key-value store under three keys:
//!
//! | Key | Value |
//! |---|---|
//! | `auth_token` | long-lived login token, used for auto-login |
//! | `auth_sid` | session id, sent as the `sid` header |
//! | `auth_expires` | token expiry, RFC 3339 |
//!
//! Passwords are never stored and never logged; log lines carry only the
//! username and the password length.

use crate::api::{ApiClient, ApiError, Envelope};
use crate::storage::{KeyValueStore, StorageError};
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

pub const TOKEN_KEY: &str = "auth_token";
pub const SID_KEY: &str = "auth_sid";
pub const EXPIRES_KEY: &str = "auth_expires";

static USERNAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("username pattern is valid"));

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Not logged in")]
    NotLoggedIn,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Failed to store credentials: {0}")]
    Storage(#[from] StorageError),
}

/// `data` payload of the login, register, and auto-login endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthData {
    pub user_id: Option<i64>,
    pub expires_at: Option<String>,
    pub sid: Option<String>,
    pub token: Option<String>,
}

pub type AuthResponse = Envelope<AuthData>;

// ============================================================================
// Stored credentials
// ============================================================================

/// Typed access to the credential keys of a [`KeyValueStore`].
///
/// Reads never fail: an unreadable or undecodable value is treated as absent.
pub struct Credentials<S> {
    store: S,
}

impl<S: KeyValueStore> Credentials<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(Some(raw)) => serde_json::from_str::<String>(&raw)
                .ok()
                .filter(|v| !v.is_empty()),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read credential");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // A JSON string is always serializable.
        let encoded = serde_json::Value::String(value.to_string()).to_string();
        self.store.set(key, &encoded)
    }

    pub fn save_tokens(&self, token: &str, sid: &str, expires_at: &str) -> Result<(), StorageError> {
        self.write(TOKEN_KEY, token)?;
        self.write(SID_KEY, sid)?;
        self.write(EXPIRES_KEY, expires_at)?;
        tracing::debug!(expires_at, "credentials saved");
        Ok(())
    }

    pub fn save_sid(&self, sid: &str) -> Result<(), StorageError> {
        self.write(SID_KEY, sid)
    }

    pub fn token(&self) -> Option<String> {
        self.read(TOKEN_KEY)
    }

    pub fn sid(&self) -> Option<String> {
        self.read(SID_KEY)
    }

    pub fn expires_at(&self) -> Option<String> {
        self.read(EXPIRES_KEY)
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Remove all three keys. Returns `false` if any removal failed.
    pub fn clear(&self) -> bool {
        let mut ok = true;
        for key in [TOKEN_KEY, SID_KEY, EXPIRES_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "failed to clear credential");
                ok = false;
            }
        }
        ok
    }

    /// Whether the stored token has expired at `now`.
    ///
    /// A missing or unparsable expiry counts as expired.
    pub fn is_token_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at()
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .is_none_or(|expires| now >= expires.with_timezone(&Utc))
    }
}

// ============================================================================
// Form validation
// ============================================================================

/// Checks applied before a login request is sent.
pub fn validate_login(username: &str, password: &str) -> Result<(), AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::Validation("Username is required".into()));
    }
    let len = username.chars().count();
    if !(3..=20).contains(&len) {
        return Err(AuthError::Validation(
            "Username must be 3-20 characters".into(),
        ));
    }
    if password.is_empty() {
        return Err(AuthError::Validation("Password is required".into()));
    }
    if password.chars().count() < 8 {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

/// Checks applied before a registration request is sent.
pub fn validate_registration(
    username: &str,
    password: &str,
    confirm: &str,
) -> Result<(), AuthError> {
    validate_login(username, password)?;
    if !USERNAME_CHARS.is_match(username.trim()) {
        return Err(AuthError::Validation(
            "Username may only contain letters and digits".into(),
        ));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(AuthError::Validation(
            "Password must contain both letters and digits".into(),
        ));
    }
    if confirm.is_empty() {
        return Err(AuthError::Validation("Please repeat the password".into()));
    }
    if password != confirm {
        return Err(AuthError::Validation("Passwords do not match".into()));
    }
    Ok(())
}

// ============================================================================
// Auth client
// ============================================================================

/// Outcome of trying to resume a stored session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Auto-login succeeded; a fresh sid is stored.
    Resumed,
    /// No token was stored.
    NoToken,
    /// The server refused the token; credentials were cleared.
    Refused(String),
}

pub struct AuthClient<S> {
    api: ApiClient<S>,
}

impl<S: KeyValueStore> AuthClient<S> {
    pub fn new(api: ApiClient<S>) -> Self {
        Self { api }
    }

    pub fn credentials(&self) -> &Credentials<S> {
        self.api.credentials()
    }

    /// `POST /api/login`. Stores token, sid, and expiry when `code == 0`.
    ///
    /// A non-zero `code` is returned as-is so the caller can show `message`.
    pub fn login(&self, username: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let username = username.trim();
        tracing::debug!(username, password_len = password.chars().count(), "logging in");
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "login_type": "password",
        });
        let response: AuthResponse = self.api.call(Method::POST, "/api/login", Some(&body))?;

        if let (true, Some(data)) = (response.is_success(), &response.data) {
            self.credentials().save_tokens(
                data.token.as_deref().unwrap_or_default(),
                data.sid.as_deref().unwrap_or_default(),
                data.expires_at.as_deref().unwrap_or_default(),
            )?;
            tracing::info!(username, "logged in");
        } else {
            tracing::warn!(username, code = response.code, message = %response.message, "login refused");
        }
        Ok(response)
    }

    /// `POST /auth/register`. Nothing is stored; the user logs in afterwards.
    pub fn register(&self, username: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let username = username.trim();
        tracing::debug!(username, password_len = password.chars().count(), "registering");
        let body = serde_json::json!({ "username": username, "password": password });
        Ok(self.api.call(Method::POST, "/auth/register", Some(&body))?)
    }

    /// `POST /auth/auto-login`. Stores the new sid when `code == 0`.
    pub fn auto_login(&self, token: &str) -> Result<AuthResponse, AuthError> {
        let body = serde_json::json!({ "token": token });
        let response: AuthResponse = self.api.call(Method::POST, "/auth/auto-login", Some(&body))?;
        if let (true, Some(data)) = (response.is_success(), &response.data) {
            self.credentials()
                .save_sid(data.sid.as_deref().unwrap_or_default())?;
        }
        Ok(response)
    }

    /// Auto-login with the stored token, as done at startup.
    ///
    /// A refusal clears the stored credentials. Transport errors leave them
    /// in place so the next attempt can retry.
    pub fn resume_session(&self) -> Result<SessionState, AuthError> {
        let Some(token) = self.credentials().token() else {
            return Ok(SessionState::NoToken);
        };
        let response = self.auto_login(&token)?;
        if response.is_success() {
            tracing::info!("session resumed");
            Ok(SessionState::Resumed)
        } else {
            self.credentials().clear();
            let message = if response.message.is_empty() {
                "auto-login failed".to_string()
            } else {
                response.message
            };
            Ok(SessionState::Refused(message))
        }
    }

    pub fn logout(&self) -> bool {
        self.credentials().clear()
    }
}
