//! API error types for the JIRA client.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// The category of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The request never produced an HTTP response.
    Network,
    /// Authentication failed or the user lacks access (401/403).
    Auth,
    /// The resource does not exist (404).
    NotFound,
    /// The request was rejected as invalid, client- or server-side.
    Validation,
    /// Rate limited by the JIRA API (429).
    RateLimited,
    /// JIRA server error (5xx).
    Server,
    /// The response had an unexpected status or could not be parsed.
    MalformedResponse,
}

impl ApiErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorKind::Network => "network",
            ApiErrorKind::Auth => "auth",
            ApiErrorKind::NotFound => "not-found",
            ApiErrorKind::Validation => "validation",
            ApiErrorKind::RateLimited => "rate-limited",
            ApiErrorKind::Server => "server",
            ApiErrorKind::MalformedResponse => "malformed-response",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the JIRA client facade.
///
/// Carries the HTTP status and the JIRA request id when they are known so
/// callers can log or act on them.
#[derive(Debug, Clone, Error)]
#[error("{kind} error{}: {message}", .status.map(|s| format!(" (HTTP {})", s.as_u16())).unwrap_or_default())]
pub struct ApiError {
    kind: ApiErrorKind,
    status: Option<StatusCode>,
    message: String,
    request_id: Option<String>,
    retry_after: Option<Duration>,
    created_key: Option<String>,
}

impl ApiError {
    /// Create an error without an HTTP status.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            request_id: None,
            retry_after: None,
            created_key: None,
        }
    }

    /// Create an error from an HTTP status code.
    ///
    /// The mapping is total: every status yields exactly one kind.
    pub fn from_status(status: StatusCode, context: &str) -> Self {
        let kind = match status.as_u16() {
            400 | 422 => ApiErrorKind::Validation,
            401 | 403 => ApiErrorKind::Auth,
            404 => ApiErrorKind::NotFound,
            429 => ApiErrorKind::RateLimited,
            500..=599 => ApiErrorKind::Server,
            _ => ApiErrorKind::MalformedResponse,
        };
        Self::new(kind, context).with_status(status)
    }

    /// A client-side validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Validation, message)
    }

    /// A response that could not be interpreted.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::MalformedResponse, message)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Mark the error as raised after an issue was already created.
    ///
    /// The key is prepended to the message so it survives display.
    pub fn with_created_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.message = format!(
            "issue {} was created but could not be fetched: {}",
            key, self.message
        );
        self.created_key = Some(key);
        self
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The `X-AREQUESTID` JIRA assigned to the failed request.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// How long JIRA asked the caller to wait before retrying.
    ///
    /// Only set for rate-limited errors.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Key of an issue that exists on the server despite this error.
    ///
    /// Retrying the create would make a duplicate.
    pub fn created_key(&self) -> Option<&str> {
        self.created_key.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }
}

/// The category of a [`TransportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection could not be established.
    Connect,
    /// An attempt exceeded the configured timeout.
    Timeout,
    /// The request failed while sending or receiving.
    Request,
    /// The request could not be built; never retried.
    InvalidRequest,
}

impl TransportErrorKind {
    /// Whether a failure of this kind is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportErrorKind::InvalidRequest)
    }
}

/// A network-level failure in the transport adapter.
#[derive(Debug, Clone, Error)]
#[error("{message} (after {attempts} attempt(s))")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    /// Number of attempts made before giving up.
    pub attempts: u32,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            attempts: 1,
            message: message.into(),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_builder() {
            TransportErrorKind::InvalidRequest
        } else {
            TransportErrorKind::Request
        };
        TransportError::new(kind, err.to_string())
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::new(ApiErrorKind::Network, err.to_string())
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
