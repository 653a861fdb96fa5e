//! JSON API client for the account service.
//!
//! Every response is an envelope:
//!
//! ```json
//! { "code": 0, "message": "ok", "data": { ... } }
//! ```
//!
//! `code == 0` is success. A 401 (either as the HTTP status or as `code`)
//! means the session is gone: stored credentials are cleared and the caller
//! gets [`ApiError::Unauthorized`], which the CLI turns into a prompt to run
//! `unmark login`.
//!
//! When a session id is stored it is sent as a `sid` header on every request.

use crate::auth::Credentials;
use crate::storage::KeyValueStore;
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session expired, please log in again")]
    Unauthorized,
    #[error("Request rejected ({code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("Request timed out")]
    Timeout,
    #[error("Network request failed: {0}")]
    Network(String),
    #[error("Unexpected HTTP status {0}")]
    Http(u16),
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

/// Response wrapper used by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Decode a response body into an envelope, without judging its `code`.
///
/// Returns `Unauthorized` for a 401 in either place. A body that is not an
/// envelope is an `Http` error for non-2xx statuses and a `Decode` error
/// otherwise.
pub fn decode_envelope<T: DeserializeOwned>(
    status: u16,
    body: &str,
) -> Result<Envelope<T>, ApiError> {
    if status == 401 {
        return Err(ApiError::Unauthorized);
    }
    let envelope: Envelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if !(200..300).contains(&status) => return Err(ApiError::Http(status)),
        Err(e) => return Err(ApiError::Decode(e.to_string())),
    };
    if envelope.code == 401 {
        return Err(ApiError::Unauthorized);
    }
    Ok(envelope)
}

/// Like [`decode_envelope`], but a non-zero `code` is an error.
pub fn decode_success<T: DeserializeOwned>(
    status: u16,
    body: &str,
) -> Result<Envelope<T>, ApiError> {
    let envelope = decode_envelope(status, body)?;
    if envelope.is_success() {
        Ok(envelope)
    } else {
        Err(rejection(envelope))
    }
}

fn rejection<T>(envelope: Envelope<T>) -> ApiError {
    let message = if envelope.message.is_empty() {
        "请求失败".to_string()
    } else {
        envelope.message
    };
    ApiError::Rejected {
        code: envelope.code,
        message,
    }
}

/// Blocking client bound to one base URL and one credential store.
pub struct ApiClient<S> {
    http: Client,
    base_url: String,
    credentials: Credentials<S>,
}

impl<S: KeyValueStore> ApiClient<S> {
    pub fn new(base_url: &str, timeout: Duration, store: S) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: Credentials::new(store),
        })
    }

    pub fn credentials(&self) -> &Credentials<S> {
        &self.credentials
    }

    /// Absolute URLs pass through; anything else is appended to the base URL.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Send a request and decode the envelope, leaving `code` to the caller.
    ///
    /// A 401 clears the stored credentials before returning `Unauthorized`.
    pub fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Envelope<T>, ApiError> {
        let url = self.url_for(path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(sid) = self.credentials.sid() {
            request = request.header("sid", sid);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(%method, %url, "api request");
        let response = request.send()?;
        let status = response.status().as_u16();
        let text = response.text()?;

        match decode_envelope(status, &text) {
            Err(ApiError::Unauthorized) => {
                tracing::warn!(%url, "unauthorized, clearing stored credentials");
                self.credentials.clear();
                Err(ApiError::Unauthorized)
            }
            other => other,
        }
    }

    /// Send a request; a non-zero `code` becomes [`ApiError::Rejected`].
    pub fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Envelope<T>, ApiError> {
        let envelope = self.call(method, path, body)?;
        if envelope.is_success() {
            Ok(envelope)
        } else {
            Err(rejection(envelope))
        }
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ApiError> {
        self.request(Method::GET, path, None)
    }

    pub fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Envelope<T>, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.request(Method::POST, path, Some(&body))
    }
}
