//! Application-level error type for the command line front end.
//!
//! Library operations return [`ConfigError`] or [`ApiError`]; the binary
//! folds them into [`AppError`] to pick a user-facing message.

use thiserror::Error;

use crate::api::{ApiError, ApiErrorKind};
use crate::config::ConfigError;

/// The main application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// IO errors (writing exported files, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Get a user-friendly message for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::Io { path, .. } => format!(
                    "Could not read or create the configuration file at {}.",
                    path.display()
                ),
                ConfigError::Parse { path, .. } => format!(
                    "Configuration file {} is invalid. Please check the file format.",
                    path.display()
                ),
                ConfigError::MissingInFile { key, path } => format!(
                    "Please set '{}' in {} before running this command.",
                    key,
                    path.display()
                ),
                ConfigError::Missing(key) => format!("Configuration key '{}' is required.", key),
                ConfigError::Invalid { key, reason } => {
                    format!("Configuration error in '{}': {}", key, reason)
                }
            },
            AppError::Api(e) if e.created_key().is_some() => format!(
                "Issue {} was created, but fetching it back failed: {}",
                e.created_key().unwrap_or_default(),
                e.message()
            ),
            AppError::Api(e) => match e.kind() {
                ApiErrorKind::Auth => {
                    "Authentication failed. Please check your username and API token.".to_string()
                }
                ApiErrorKind::NotFound => e.message().to_string(),
                ApiErrorKind::Validation => format!("JIRA rejected the request: {}", e.message()),
                ApiErrorKind::RateLimited => match e.retry_after() {
                    Some(wait) => format!(
                        "Too many requests. Please wait {} second(s) and try again.",
                        wait.as_secs()
                    ),
                    None => "Too many requests. Please wait a moment and try again.".to_string(),
                },
                ApiErrorKind::Server => "JIRA server error. Please try again later.".to_string(),
                ApiErrorKind::Network => {
                    "Could not connect to JIRA. Please check your URL and network.".to_string()
                }
                ApiErrorKind::MalformedResponse => {
                    "Unexpected response from JIRA. Please try again.".to_string()
                }
            },
            AppError::Io(_) => "A file operation failed. Please check file permissions.".to_string(),
        }
    }

    /// Check if this error is recoverable.
    ///
    /// Recoverable errors may succeed if the same command is run again later.
    /// A create whose issue already exists is never recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Api(e) if e.created_key().is_none() && matches!(
                e.kind(),
                ApiErrorKind::Network | ApiErrorKind::RateLimited | ApiErrorKind::Server
            )
        )
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Api(e) if e.created_key().is_some() => {
                Some("Do not run 'create' again; use 'jira-api-client issue <KEY>' to view it.")
            }
            AppError::Config(ConfigError::MissingInFile { .. })
            | AppError::Config(ConfigError::Missing(_)) => {
                Some("Run 'jira-api-client config' to see where settings are read from.")
            }
            AppError::Api(e) if e.kind() == ApiErrorKind::Auth => Some(
                "Check your API token at https://id.atlassian.com/manage-profile/security/api-tokens",
            ),
            AppError::Api(e) if e.kind() == ApiErrorKind::Network => {
                Some("Check your internet connection and JIRA URL.")
            }
            _ => None,
        }
    }

    /// The request id JIRA assigned to the failing request, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            AppError::Api(e) => e.request_id(),
            _ => None,
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;
