//! A typed client facade for the JIRA REST API.
//!
//! Configuration is loaded once into an immutable [`ConnectionConfig`], the
//! [`JiraClient`] exposes typed operations, and every non-2xx response is
//! translated into a single [`ApiError`] taxonomy.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;

pub use api::{
    classify, ApiError, ApiErrorKind, HttpTransport, Issue, IssueSearch, JiraClient, NewIssue,
    SearchQuery, Transport,
};
pub use config::{ConfigError, ConfigFile, ConnectionConfig, Credentials, EnvSource};
pub use error::AppError;
