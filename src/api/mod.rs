//! JIRA API client and types.
//!
//! This module provides the interface for communicating with the JIRA REST API.

mod auth;
mod classify;
mod client;
pub mod error;
mod search;
mod transport;
pub mod types;

#[cfg(test)]
mod tests;

pub use auth::Auth;
pub use classify::{classify, REQUEST_ID_HEADER};
pub use client::JiraClient;
pub use error::{ApiError, ApiErrorKind, TransportError, TransportErrorKind};
pub use search::{IssueSearch, SearchQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use transport::{ApiRequest, HttpTransport, RawResponse, Transport, USER_AGENT};
pub use types::{CreatedIssue, CurrentUser, Issue, NewIssue, SearchPage};
