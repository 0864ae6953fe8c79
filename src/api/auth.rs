//! Authentication handling for JIRA API.
//!
//! JIRA accepts Basic Auth (email + API token, or user + password) and
//! Bearer personal access tokens. The header value is computed once when
//! the transport is built.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::config::Credentials;

/// A precomputed `Authorization` header.
#[derive(Clone)]
pub struct Auth {
    /// The user name, if Basic auth is used.
    username: Option<String>,
    /// The complete header value, including the scheme.
    auth_header: String,
}

impl Auth {
    /// Build the header for the given credentials.
    ///
    /// The secret is immediately encoded and not stored separately.
    pub fn new(credentials: &Credentials) -> Self {
        match credentials {
            Credentials::Bearer { token } => Self {
                username: None,
                auth_header: format!("Bearer {}", token),
            },
            Credentials::Basic { username, secret } => Self {
                username: Some(username.clone()),
                auth_header: build_basic_header(username, secret),
            },
        }
    }

    /// Get the authorization header value for HTTP requests.
    pub fn header_value(&self) -> &str {
        &self.auth_header
    }

    pub fn scheme(&self) -> &str {
        self.auth_header
            .split_once(' ')
            .map(|(scheme, _)| scheme)
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("scheme", &self.scheme())
            .field("username", &self.username)
            .finish()
    }
}

/// Build the Basic Auth header value.
///
/// Encodes "username:secret" in Base64 and prepends "Basic ".
fn build_basic_header(username: &str, secret: &str) -> String {
    let credentials = format!("{}:{}", username, secret);
    let encoded = BASE64.encode(credentials.as_bytes());
    format!("Basic {}", encoded)
}
