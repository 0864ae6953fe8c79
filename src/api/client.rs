//! JIRA API client implementation.
//!
//! This module provides the facade callers use instead of raw HTTP. Every
//! operation builds an [`ApiRequest`], hands it to the [`Transport`], runs
//! the response through [`classify`], and only then parses a domain record.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::classify::classify;
use super::error::{ApiError, Result};
use super::search::{IssueSearch, SearchQuery};
use super::transport::{ApiRequest, HttpTransport, RawResponse, Transport};
use super::types::{CreatedIssue, CurrentUser, Issue, NewIssue, SearchPage, SearchResponse};
use crate::config::ConnectionConfig;

/// REST API root used for every JSON endpoint.
const API_ROOT: &str = "/rest/api/2";

const ACCEPT_XML: &str = "application/xml, text/xml";

/// The JIRA API client.
///
/// Generic over the transport so the facade can be driven without a
/// network; [`HttpTransport`] is the default.
#[derive(Debug)]
pub struct JiraClient<T: Transport = HttpTransport> {
    /// The transport adapter.
    transport: T,
    /// Connection settings, read-only after construction.
    config: ConnectionConfig,
}

impl JiraClient<HttpTransport> {
    /// Create a new JIRA client over HTTP.
    ///
    /// Does NOT validate the connection; call [`current_user`](Self::current_user)
    /// for that.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.clone())?;
        Ok(Self { transport, config })
    }
}

impl<T: Transport> JiraClient<T> {
    /// Create a client over an explicit transport.
    pub fn with_transport(config: ConnectionConfig, transport: T) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get the current authenticated user.
    ///
    /// Calls `GET /rest/api/2/myself`; doubles as a connection check.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<CurrentUser> {
        let user: CurrentUser = self
            .fetch_json(ApiRequest::get(format!("{}/myself", API_ROOT)))
            .await?;
        info!("Connected as user: {}", user.display_name);
        Ok(user)
    }

    /// Get a single issue by key.
    ///
    /// # Arguments
    ///
    /// * `key` - The issue key (e.g., "PROJ-123")
    ///
    /// # Errors
    ///
    /// Returns a not-found [`ApiError`] if the key does not resolve.
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn get_issue(&self, key: &str) -> Result<Issue> {
        debug!("Fetching issue");

        let path = format!("{}/issue/{}", API_ROOT, urlencoding::encode(key));
        let value: Value = self.fetch_json(ApiRequest::get(path)).await.map_err(|e| {
            if e.is_not_found() {
                ApiError::from_status(StatusCode::NOT_FOUND, &format!("Issue '{}' not found", key))
                    .with_request_id(e.request_id().map(str::to_string))
            } else {
                e
            }
        })?;

        let issue = Issue::from_value(value)?;
        debug!("Fetched issue: {}", issue.key());
        Ok(issue)
    }

    /// Search for issues using JQL.
    ///
    /// Returns a lazy pager; no request is sent until it is polled.
    pub fn search_issues(&self, query: SearchQuery) -> IssueSearch<'_, T> {
        IssueSearch::new(self, query)
    }

    /// Fetch a single page of search results at the query's cursor.
    #[instrument(skip(self), fields(jql = %query.jql, start_at = query.start_at))]
    pub async fn search_page(&self, query: &SearchQuery) -> Result<SearchPage> {
        debug!(
            "Searching issues: startAt={}, maxResults={}",
            query.start_at, query.page_size
        );

        let request = ApiRequest::get(format!("{}/search", API_ROOT))
            .with_query("jql", &query.jql)
            .with_query("startAt", query.start_at)
            .with_query("maxResults", query.page_size);

        let raw: SearchResponse = self.fetch_json(request).await?;
        let page = SearchPage::try_from(raw)?;
        debug!("Found {} issues (total: {})", page.issues.len(), page.total);
        Ok(page)
    }

    /// Create an issue and return it as stored by JIRA.
    ///
    /// Required fields are checked before anything is sent; a request with
    /// missing fields fails with a validation error and no network call.
    #[instrument(skip(self, issue))]
    pub async fn create_issue(&self, issue: &NewIssue) -> Result<Issue> {
        issue.validate()?;

        let request = ApiRequest::post(format!("{}/issue", API_ROOT), issue.to_body());
        let created: CreatedIssue = self.fetch_json(request).await?;
        info!("Created issue {}", created.key);

        self.get_issue(&created.key).await.map_err(|e| {
            warn!("Issue {} was created but fetching it failed: {}", created.key, e);
            e.with_created_key(created.key.as_str())
        })
    }

    /// Get the XML export of an issue.
    ///
    /// Calls `GET /si/jira.issueviews:issue-xml/{key}/{key}.xml`.
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn issue_xml(&self, key: &str) -> Result<String> {
        let key = urlencoding::encode(key);
        let request = ApiRequest::get(format!("/si/jira.issueviews:issue-xml/{key}/{key}.xml"))
            .with_accept(ACCEPT_XML);

        let response = self.execute(&request).await?;
        Ok(response.body)
    }

    /// Send a request and classify the response.
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse> {
        let response = self.transport.send(request).await?;
        classify(response).map_err(|e| {
            debug!("{} {} failed: {}", request.method, request.path, e);
            e
        })
    }

    /// Send a request, classify, and parse the JSON body.
    async fn fetch_json<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        let response = self.execute(&request).await?;
        response.json::<R>().map_err(|e| {
            ApiError::malformed(format!("Failed to parse response: {}", e))
                .with_status(response.status)
        })
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::api::error::ApiErrorKind;
    use crate::api::transport::mock::MockTransport;
    use crate::config::Credentials;

    fn client(transport: MockTransport) -> JiraClient<MockTransport> {
        let config = ConnectionConfig::new(
            "https://company.atlassian.net",
            Credentials::Basic {
                username: "user@company.com".to_string(),
                secret: "token".to_string(),
            },
        )
        .unwrap();
        JiraClient::with_transport(config, transport)
    }

    fn issue_body(key: &str) -> Value {
        json!({
            "id": "10001",
            "key": key,
            "fields": {
                "summary": "Test issue",
                "status": { "id": "1", "name": "In Progress" },
                "assignee": { "displayName": "Jane Doe" }
            }
        })
    }

    #[tokio::test]
    async fn test_get_issue() {
        let client = client(MockTransport::new().respond_json(200, issue_body("PROJ-1")));

        let issue = assert_ok!(client.get_issue("PROJ-1").await);
        assert_eq!(issue.key(), "PROJ-1");
        assert_eq!(issue.status(), "In Progress");
        assert_eq!(issue.assignee(), Some("Jane Doe"));

        let requests = client.transport().requests();
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].path, "/rest/api/2/issue/PROJ-1");
    }

    #[tokio::test]
    async fn test_get_issue_not_found() {
        let client = client(MockTransport::new().respond(
            RawResponse::new(
                StatusCode::NOT_FOUND,
                json!({ "errorMessages": ["Issue does not exist"] }).to_string(),
            )
            .with_header("x-arequestid", "req-1"),
        ));

        let err = assert_err!(client.get_issue("NOPE-1").await);
        assert_eq!(err.kind(), ApiErrorKind::NotFound);
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.message(), "Issue 'NOPE-1' not found");
        assert_eq!(err.request_id(), Some("req-1"));
    }

    #[tokio::test]
    async fn test_get_issue_encodes_key() {
        let client = client(MockTransport::new().respond_json(404, json!({})));

        let _ = client.get_issue("../admin").await;
        assert_eq!(
            client.transport().requests()[0].path,
            "/rest/api/2/issue/..%2Fadmin"
        );
    }

    #[tokio::test]
    async fn test_error_status_short_circuits_parsing() {
        // The body would parse as an issue, but a 401 is never parsed.
        let client = client(MockTransport::new().respond_json(401, issue_body("PROJ-1")));

        let err = assert_err!(client.get_issue("PROJ-1").await);
        assert_eq!(err.kind(), ApiErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let client = client(
            MockTransport::new().respond(RawResponse::new(StatusCode::OK, "<html>login</html>")),
        );

        let err = assert_err!(client.get_issue("PROJ-1").await);
        assert_eq!(err.kind(), ApiErrorKind::MalformedResponse);
        assert_eq!(err.status(), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_schema_invalid_issue_is_malformed() {
        let client = client(MockTransport::new().respond_json(
            200,
            json!({ "id": "1", "key": "PROJ-1", "fields": { "status": { "name": "Open" } } }),
        ));

        let err = assert_err!(client.get_issue("PROJ-1").await);
        assert_eq!(err.kind(), ApiErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_create_issue_missing_fields_sends_nothing() {
        let client = client(MockTransport::new());

        let err = assert_err!(
            client
                .create_issue(&NewIssue::new().project("PROJ").issue_type("Task"))
                .await
        );
        assert_eq!(err.kind(), ApiErrorKind::Validation);
        assert!(err.message().contains("summary"));
        assert!(client.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_issue_fetches_created_issue() {
        let transport = MockTransport::new()
            .respond_json(
                201,
                json!({ "id": "10001", "key": "PROJ-7", "self": "https://company.atlassian.net/rest/api/2/issue/10001" }),
            )
            .respond_json(200, issue_body("PROJ-7"));
        let client = client(transport);

        let new_issue = NewIssue::new()
            .project("PROJ")
            .issue_type("Task")
            .summary("Test issue");
        let issue = assert_ok!(client.create_issue(&new_issue).await);
        assert_eq!(issue.key(), "PROJ-7");

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, "/rest/api/2/issue");
        assert_eq!(requests[0].body.as_ref(), Some(&new_issue.to_body()));
        assert_eq!(requests[1].path, "/rest/api/2/issue/PROJ-7");
    }

    #[tokio::test]
    async fn test_create_issue_failed_fetch_reports_created_key() {
        let transport = MockTransport::new()
            .respond_json(201, json!({ "id": "10001", "key": "PROJ-7" }))
            .respond_json(500, json!({ "errorMessages": ["Internal server error"] }));
        let client = client(transport);

        let new_issue = NewIssue::new()
            .project("PROJ")
            .issue_type("Task")
            .summary("Test issue");
        let err = assert_err!(client.create_issue(&new_issue).await);

        assert_eq!(err.kind(), ApiErrorKind::Server);
        assert_eq!(err.created_key(), Some("PROJ-7"));
        assert!(err.to_string().contains("PROJ-7"));
        assert_eq!(client.transport().requests().len(), 2);
    }

    #[tokio::test]
    async fn test_create_issue_server_validation() {
        let client = client(MockTransport::new().respond_json(
            400,
            json!({ "errorMessages": [], "errors": { "components": "Component is required." } }),
        ));

        let new_issue = NewIssue::new()
            .project("PROJ")
            .issue_type("Bug")
            .summary("Crash");
        let err = assert_err!(client.create_issue(&new_issue).await);
        assert_eq!(err.kind(), ApiErrorKind::Validation);
        assert_eq!(err.message(), "components: Component is required.");
    }

    #[tokio::test]
    async fn test_current_user() {
        let client = client(MockTransport::new().respond_json(
            200,
            json!({ "name": "jdoe", "displayName": "Jane Doe", "emailAddress": "jane@company.com" }),
        ));

        let user = assert_ok!(client.current_user().await);
        assert_eq!(user.display_name, "Jane Doe");
        assert_eq!(client.transport().requests()[0].path, "/rest/api/2/myself");
    }

    #[tokio::test]
    async fn test_issue_xml() {
        let xml = "<rss><channel><item><key>PROJ-1</key></item></channel></rss>";
        let client = client(MockTransport::new().respond(RawResponse::new(StatusCode::OK, xml)));

        let body = assert_ok!(client.issue_xml("PROJ-1").await);
        assert_eq!(body, xml);

        let request = &client.transport().requests()[0];
        assert_eq!(request.path, "/si/jira.issueviews:issue-xml/PROJ-1/PROJ-1.xml");
        assert_eq!(request.accept, ACCEPT_XML);
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let client = client(MockTransport::new().respond(
            RawResponse::new(StatusCode::TOO_MANY_REQUESTS, "").with_header("retry-after", "7"),
        ));

        let err = assert_err!(client.get_issue("PROJ-1").await);
        assert_eq!(err.kind(), ApiErrorKind::RateLimited);
        assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(7)));
        assert_eq!(client.transport().requests().len(), 1);
    }
}
