//! JIRA API request and response types.
//!
//! These types model the JIRA REST API v2 responses for issues and search
//! results. Wire shapes are deserialized into private `*Response` structs
//! first; domain records like [`Issue`] are only built once the whole
//! payload has been validated.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ApiError, Result};

/// The current authenticated user.
///
/// Returned by `GET /rest/api/2/myself`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// The user's account ID (Cloud).
    #[serde(default)]
    pub account_id: Option<String>,
    /// The user name (Server / Data Center).
    #[serde(default)]
    pub name: Option<String>,
    /// The user's display name.
    pub display_name: String,
    /// The user's email address (may be empty if hidden).
    #[serde(default)]
    pub email_address: String,
    /// Whether the user is active.
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// A JIRA issue.
///
/// Only constructed by parsing a complete response; callers get read-only
/// access.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    id: String,
    key: String,
    summary: String,
    status: String,
    assignee: Option<String>,
    fields: BTreeMap<String, Value>,
}

impl Issue {
    /// Parse an issue from a JSON value, failing if required fields are
    /// missing or have the wrong shape.
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: IssueResponse = serde_json::from_value(value)
            .map_err(|e| ApiError::malformed(format!("Failed to parse issue: {}", e)))?;
        Self::try_from(raw)
    }

    /// The issue ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The issue key (e.g., "PROJ-123").
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// The status name (e.g., "To Do", "In Progress", "Done").
    pub fn status(&self) -> &str {
        &self.status
    }

    /// The assignee display name, if assigned.
    pub fn assignee(&self) -> Option<&str> {
        self.assignee.as_deref()
    }

    /// Get the assignee display name, or "Unassigned" if not set.
    pub fn assignee_name(&self) -> &str {
        self.assignee().unwrap_or("Unassigned")
    }

    /// All fields as returned by JIRA, keyed by field id.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// A single raw field, e.g. `"priority"` or `"customfield_10016"`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    /// The description as plain text, or empty string if not set.
    pub fn description(&self) -> &str {
        self.field("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The issue type name, if present.
    pub fn issue_type(&self) -> Option<&str> {
        self.named_field("issuetype")
    }

    /// The priority name, if set.
    pub fn priority(&self) -> Option<&str> {
        self.named_field("priority")
    }

    /// The project key, if present.
    pub fn project_key(&self) -> Option<&str> {
        self.field("project")
            .and_then(|p| p.get("key"))
            .and_then(Value::as_str)
    }

    fn named_field(&self, name: &str) -> Option<&str> {
        self.field(name)
            .and_then(|v| v.get("name"))
            .and_then(Value::as_str)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.summary)
    }
}

/// An issue as it appears on the wire.
#[derive(Debug, Deserialize)]
pub(crate) struct IssueResponse {
    id: String,
    key: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl TryFrom<IssueResponse> for Issue {
    type Error = ApiError;

    fn try_from(raw: IssueResponse) -> Result<Self> {
        let malformed =
            |what: &str| ApiError::malformed(format!("issue {}: {}", raw.key, what));

        let summary = raw
            .fields
            .get("summary")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing string field 'summary'"))?
            .to_string();

        let status = raw
            .fields
            .get("status")
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing field 'status.name'"))?
            .to_string();

        let assignee = match raw.fields.get("assignee") {
            None | Some(Value::Null) => None,
            Some(user) => Some(
                user.get("displayName")
                    .and_then(Value::as_str)
                    .ok_or_else(|| malformed("assignee has no 'displayName'"))?
                    .to_string(),
            ),
        };

        Ok(Issue {
            id: raw.id,
            key: raw.key,
            summary,
            status,
            assignee,
            fields: raw.fields.into_iter().collect(),
        })
    }
}

/// One page of search results as returned by `GET /rest/api/2/search`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResponse {
    start_at: u32,
    max_results: u32,
    total: u32,
    #[serde(default)]
    issues: Vec<IssueResponse>,
}

/// A validated page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    /// The index of the first result.
    pub start_at: u32,
    /// Maximum results requested.
    pub max_results: u32,
    /// Total number of matching issues.
    pub total: u32,
    /// The issues on this page.
    pub issues: Vec<Issue>,
}

impl SearchPage {
    /// Check if there are more pages of results.
    pub fn has_more(&self) -> bool {
        !self.issues.is_empty() && self.next_start() < self.total
    }

    /// Get the starting index for the next page.
    pub fn next_start(&self) -> u32 {
        let len = u32::try_from(self.issues.len()).unwrap_or(u32::MAX);
        self.start_at.saturating_add(len)
    }
}

impl TryFrom<SearchResponse> for SearchPage {
    type Error = ApiError;

    /// Fails as a whole if any issue on the page is malformed.
    fn try_from(raw: SearchResponse) -> Result<Self> {
        let issues = raw
            .issues
            .into_iter()
            .map(Issue::try_from)
            .collect::<Result<Vec<_>>>()?;

        u32::try_from(issues.len())
            .ok()
            .and_then(|len| raw.start_at.checked_add(len))
            .ok_or_else(|| {
                ApiError::malformed(format!(
                    "search page at startAt={} with {} issue(s) overflows the result index",
                    raw.start_at,
                    issues.len()
                ))
            })?;

        Ok(SearchPage {
            start_at: raw.start_at,
            max_results: raw.max_results,
            total: raw.total,
            issues,
        })
    }
}

/// Response to `POST /rest/api/2/issue`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self", default)]
    pub self_url: Option<String>,
}

/// Fields for a new issue.
///
/// `project`, `issuetype` and `summary` are required; they are checked by
/// [`NewIssue::validate`] before anything is sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewIssue {
    fields: Map<String, Value>,
}

impl NewIssue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the project by key (e.g., "PROJ").
    pub fn project(self, key: &str) -> Self {
        self.field("project", serde_json::json!({ "key": key }))
    }

    /// Set the issue type by name (e.g., "Bug", "Task").
    pub fn issue_type(self, name: &str) -> Self {
        self.field("issuetype", serde_json::json!({ "name": name }))
    }

    pub fn summary(self, summary: &str) -> Self {
        self.field("summary", Value::String(summary.to_string()))
    }

    pub fn description(self, description: &str) -> Self {
        self.field("description", Value::String(description.to_string()))
    }

    /// Set an arbitrary field by id.
    pub fn field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Check that the fields JIRA always requires are present.
    pub fn validate(&self) -> Result<()> {
        let has_ref = |name: &str, keys: &[&str]| {
            self.fields
                .get(name)
                .map(|v| keys.iter().any(|k| non_empty_str(v.get(*k))))
                .unwrap_or(false)
        };

        let mut missing = Vec::new();
        if !has_ref("project", &["key", "id"]) {
            missing.push("project");
        }
        if !has_ref("issuetype", &["name", "id"]) {
            missing.push("issuetype");
        }
        if !non_empty_str(self.fields.get("summary")) {
            missing.push("summary");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// The request body for `POST /rest/api/2/issue`.
    pub(crate) fn to_body(&self) -> Value {
        serde_json::json!({ "fields": self.fields })
    }
}

fn non_empty_str(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false)
}
