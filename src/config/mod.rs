//! Configuration management for the JIRA client.
//!
//! Connection settings are read from a key/value [`ConfigSource`]: an
//! in-memory map, the TOML config file, the environment, or a layered
//! combination of those. The resulting [`ConnectionConfig`] is immutable.

mod connection;
mod file;
mod source;

use std::path::PathBuf;

use thiserror::Error;

pub use connection::{
    ConnectionConfig, Credentials, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_RETRY_COUNT,
    DEFAULT_TIMEOUT_MS,
};
pub use file::{default_config_path, ConfigFile};
pub use source::{ConfigSource, EnvSource, Layered};

/// Configuration key for the JIRA instance URL.
pub const KEY_BASE_URL: &str = "baseUrl";
/// Configuration key for the API token (or personal access token).
pub const KEY_AUTH_TOKEN: &str = "authToken";
/// Configuration key for the user name or email address.
pub const KEY_USERNAME: &str = "username";
/// Configuration key for a password used instead of an API token.
pub const KEY_PASSWORD: &str = "password";
/// Configuration key for the per-attempt request timeout.
pub const KEY_TIMEOUT_MS: &str = "timeoutMs";
/// Configuration key for the number of retries after a network failure.
pub const KEY_RETRY_COUNT: &str = "retryCount";
/// Configuration key for the base retry backoff.
pub const KEY_RETRY_BACKOFF_MS: &str = "retryBackoffMs";

/// Errors raised while loading configuration.
///
/// These are fatal at startup: nothing is retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is absent or empty.
    #[error("missing required configuration key '{0}'")]
    Missing(&'static str),

    /// A required key is absent from a specific config file.
    #[error("missing required configuration key '{key}' in {}", .path.display())]
    MissingInFile { key: &'static str, path: PathBuf },

    /// A key is present but its value is unusable.
    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },

    /// The platform config directory could not be determined.
    #[error("could not determine configuration directory")]
    NoConfigDir,

    /// Reading or creating the config file failed.
    #[error("config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }

    /// The configuration key this error refers to, if any.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            ConfigError::Missing(key) => Some(key),
            ConfigError::MissingInFile { key, .. } => Some(key),
            ConfigError::Invalid { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
