//! JIRA connection configuration.

use std::fmt;
use std::time::Duration;

use reqwest::Url;

use super::{
    ConfigError, ConfigSource, Result, KEY_AUTH_TOKEN, KEY_BASE_URL, KEY_PASSWORD,
    KEY_RETRY_BACKOFF_MS, KEY_RETRY_COUNT, KEY_TIMEOUT_MS, KEY_USERNAME,
};

/// Default per-attempt request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default number of retries after a network failure.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default base delay between retries in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

/// Credentials used to authenticate against JIRA.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access token sent as `Authorization: Bearer ...`.
    Bearer { token: String },
    /// User name (or email) with an API token or password, sent as Basic auth.
    Basic { username: String, secret: String },
}

impl Credentials {
    /// The user name for Basic auth, if any.
    pub fn username(&self) -> Option<&str> {
        match self {
            Credentials::Bearer { .. } => None,
            Credentials::Basic { username, .. } => Some(username),
        }
    }
}

// Secrets never appear in debug output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("secret", &"<redacted>")
                .finish(),
        }
    }
}

/// Connection settings for a JIRA instance.
///
/// Immutable once loaded; cloned into the transport and held for the
/// lifetime of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// The JIRA instance URL without a trailing slash.
    pub base_url: String,
    /// Authentication credentials.
    pub credentials: Credentials,
    /// Timeout applied to each individual network attempt.
    pub timeout: Duration,
    /// Number of retries after the first failed attempt.
    pub retry_count: u32,
    /// Base delay for exponential backoff between retries.
    pub retry_backoff: Duration,
}

impl ConnectionConfig {
    /// Create a config with default timeout and retry policy.
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        Ok(Self {
            base_url: validate_base_url(base_url)?,
            credentials,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            retry_count: DEFAULT_RETRY_COUNT,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        })
    }

    /// Load and validate connection settings from a configuration source.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if:
    /// - `baseUrl` is missing or is not an absolute http(s) URL
    /// - no usable credentials are present
    /// - a numeric setting does not parse
    pub fn load<S: ConfigSource + ?Sized>(source: &S) -> Result<Self> {
        let base_url = required(source, KEY_BASE_URL)?;
        let base_url = validate_base_url(&base_url)?;
        let credentials = load_credentials(source)?;

        let timeout_ms = optional_number(source, KEY_TIMEOUT_MS)?.unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::invalid(
                KEY_TIMEOUT_MS,
                "timeout must be greater than zero",
            ));
        }

        let retry_count = match optional_number(source, KEY_RETRY_COUNT)? {
            Some(n) => u32::try_from(n)
                .map_err(|_| ConfigError::invalid(KEY_RETRY_COUNT, "value is too large"))?,
            None => DEFAULT_RETRY_COUNT,
        };

        let retry_backoff_ms =
            optional_number(source, KEY_RETRY_BACKOFF_MS)?.unwrap_or(DEFAULT_RETRY_BACKOFF_MS);

        Ok(Self {
            base_url,
            credentials,
            timeout: Duration::from_millis(timeout_ms),
            retry_count,
            retry_backoff: Duration::from_millis(retry_backoff_ms),
        })
    }

    /// Set the per-attempt timeout.
    ///
    /// Must be non-zero; `HttpTransport` refuses a zero timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Join a request path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn non_empty<S: ConfigSource + ?Sized>(source: &S, key: &str) -> Option<String> {
    source
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<S: ConfigSource + ?Sized>(source: &S, key: &'static str) -> Result<String> {
    non_empty(source, key).ok_or(ConfigError::Missing(key))
}

fn optional_number<S: ConfigSource + ?Sized>(source: &S, key: &'static str) -> Result<Option<u64>> {
    non_empty(source, key)
        .map(|raw| {
            raw.parse::<u64>().map_err(|_| {
                ConfigError::invalid(key, format!("'{}' is not a non-negative integer", raw))
            })
        })
        .transpose()
}

fn load_credentials<S: ConfigSource + ?Sized>(source: &S) -> Result<Credentials> {
    let token = non_empty(source, KEY_AUTH_TOKEN);
    let password = non_empty(source, KEY_PASSWORD);

    match non_empty(source, KEY_USERNAME) {
        Some(username) => match token.or(password) {
            Some(secret) => Ok(Credentials::Basic { username, secret }),
            None => Err(ConfigError::Missing(KEY_AUTH_TOKEN)),
        },
        None => match token {
            Some(token) => Ok(Credentials::Bearer { token }),
            None if password.is_some() => Err(ConfigError::Missing(KEY_USERNAME)),
            None => Err(ConfigError::Missing(KEY_AUTH_TOKEN)),
        },
    }
}

/// Check that the base URL is an absolute http(s) URL and strip trailing slashes.
fn validate_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');

    let url = Url::parse(trimmed)
        .map_err(|e| ConfigError::invalid(KEY_BASE_URL, format!("'{}' is not a URL: {}", raw, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::invalid(
            KEY_BASE_URL,
            format!("URL must start with http:// or https://, got '{}'", raw),
        ));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::invalid(KEY_BASE_URL, "URL has no host"));
    }

    if url.scheme() == "http" && url.host_str() != Some("localhost") {
        tracing::warn!("URL does not use HTTPS: {}. This is insecure for production use.", trimmed);
    }

    Ok(trimmed.to_string())
}
