//! HTTP transport adapter.
//!
//! The [`Transport`] trait is the seam between the client facade and the
//! network. [`HttpTransport`] is the reqwest-backed implementation: it
//! applies authentication and the per-attempt timeout, and retries
//! network-level failures with exponential backoff. Any HTTP response,
//! including 4xx and 5xx, is returned as-is for the caller to classify.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, debug_span, error, warn, Instrument, Span};

use super::auth::Auth;
use super::error::{TransportError, TransportErrorKind};
use crate::config::ConnectionConfig;

/// User-Agent header value for the JIRA API client.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const ACCEPT_JSON: &str = "application/json";

/// A request relative to the JIRA base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the base URL, e.g. `/rest/api/2/issue/PROJ-1`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub accept: &'static str,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            accept: ACCEPT_JSON,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_accept(mut self, accept: &'static str) -> Self {
        self.accept = accept;
        self
    }

    /// Look up a query parameter by name.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response as received, before classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a header, ignoring names or values that are not valid HTTP.
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Get a header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// Sends requests to JIRA.
pub trait Transport: Send + Sync {
    /// Send a request and return the raw response.
    ///
    /// Any HTTP status counts as a successful send; only failures to obtain
    /// a response are reported as [`TransportError`].
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// The reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// The HTTP client.
    client: Client,
    /// Connection settings.
    config: ConnectionConfig,
    /// Authentication header.
    auth: Auth,
    /// Parent span for every request sent through this transport.
    span: Span,
}

impl HttpTransport {
    /// Create a transport that logs under the caller's current span.
    pub fn new(config: ConnectionConfig) -> Result<Self, TransportError> {
        Self::with_span(config, Span::current())
    }

    /// Create a transport whose request spans are children of `span`.
    pub fn with_span(config: ConnectionConfig, span: Span) -> Result<Self, TransportError> {
        let client = build_http_client(config.timeout)?;
        let auth = Auth::new(&config.credentials);
        Ok(Self {
            client,
            config,
            auth,
            span,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Calculate retry delay with exponential backoff.
    fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.config.retry_backoff.saturating_mul(factor)
    }

    /// Execute a single attempt.
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let url = self.config.url_for(&request.path);

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(header::AUTHORIZATION, self.auth.header_value())
            .header(header::ACCEPT, request.accept);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let span = debug_span!(
            parent: &self.span,
            "jira_request",
            method = %request.method,
            path = %request.path
        );

        async {
            let max_attempts = self.config.retry_count.saturating_add(1);
            let mut attempts = 0;

            loop {
                attempts += 1;
                debug!("Request attempt {}/{}", attempts, max_attempts);

                match self.execute(request).await {
                    Ok(response) => {
                        debug!(status = %response.status, "Received response");
                        return Ok(response);
                    }
                    Err(e) if e.kind.is_retryable() && attempts < max_attempts => {
                        let delay = self.retry_delay(attempts);
                        warn!(
                            "Request failed (attempt {}), retrying in {}ms: {}",
                            attempts,
                            delay.as_millis(),
                            e.message
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Err(e) => {
                        error!("Request failed after {} attempt(s): {}", attempts, e.message);
                        return Err(e.with_attempts(attempts));
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Build the HTTP client with appropriate settings.
fn build_http_client(timeout: Duration) -> Result<Client, TransportError> {
    if timeout.is_zero() {
        return Err(TransportError::new(
            TransportErrorKind::InvalidRequest,
            "request timeout must be greater than zero",
        ));
    }

    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| TransportError::new(TransportErrorKind::InvalidRequest, e.to_string()))
}
