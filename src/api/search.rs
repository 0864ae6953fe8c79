//! Paginated JQL search.

use std::collections::VecDeque;

use tracing::debug;

use super::client::JiraClient;
use super::error::Result;
use super::transport::Transport;
use super::types::{Issue, SearchPage};

/// Default number of issues requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// JIRA caps `maxResults` for search.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A JQL query plus the pagination cursor to start from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// The JQL query string.
    pub jql: String,
    /// The index of the first issue to return (0-based).
    pub start_at: u32,
    /// Maximum number of issues per page.
    pub page_size: u32,
}

impl SearchQuery {
    pub fn new(jql: impl Into<String>) -> Self {
        Self {
            jql: jql.into(),
            start_at: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn start_at(mut self, start_at: u32) -> Self {
        self.start_at = start_at;
        self
    }

    /// Set the page size, clamped to `1..=100`.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// The same query positioned at another offset.
    pub(crate) fn at(&self, start_at: u32) -> Self {
        Self {
            start_at,
            ..self.clone()
        }
    }
}

/// A lazy, finite, restartable sequence of search results.
///
/// Nothing is fetched until the first call to [`next_page`](Self::next_page)
/// or [`next`](Self::next). The cursor only advances after a page is fetched
/// and parsed successfully, so after an error the same call can simply be
/// repeated.
pub struct IssueSearch<'a, T: Transport> {
    client: &'a JiraClient<T>,
    query: SearchQuery,
    cursor: u32,
    done: bool,
    buffer: VecDeque<Issue>,
}

impl<'a, T: Transport> IssueSearch<'a, T> {
    pub(crate) fn new(client: &'a JiraClient<T>, query: SearchQuery) -> Self {
        let cursor = query.start_at;
        Self {
            client,
            query,
            cursor,
            done: false,
            buffer: VecDeque::new(),
        }
    }

    /// The query this search was created from.
    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// The offset of the next page to fetch.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Whether the last page has been fetched.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Rewind to the query's initial cursor, dropping any buffered issues.
    pub fn restart(&mut self) {
        self.cursor = self.query.start_at;
        self.done = false;
        self.buffer.clear();
    }

    /// Fetch the next page.
    ///
    /// Returns `None` once the result set is exhausted. On error the cursor
    /// is left where it was.
    pub async fn next_page(&mut self) -> Option<Result<Vec<Issue>>> {
        if self.done {
            return None;
        }

        let page = match self.client.search_page(&self.query.at(self.cursor)).await {
            Ok(page) => page,
            Err(e) => return Some(Err(e)),
        };

        self.advance(&page);
        if page.issues.is_empty() {
            return None;
        }
        Some(Ok(page.issues))
    }

    /// Yield the next issue, fetching a new page when the buffer runs dry.
    pub async fn next(&mut self) -> Option<Result<Issue>> {
        loop {
            if let Some(issue) = self.buffer.pop_front() {
                return Some(Ok(issue));
            }
            match self.next_page().await? {
                Ok(issues) => self.buffer.extend(issues),
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Drain every remaining issue.
    ///
    /// If a page fails, the issues gathered so far go back into the buffer,
    /// so calling this again returns them ahead of the later pages.
    pub async fn collect_all(&mut self) -> Result<Vec<Issue>> {
        let mut issues: Vec<Issue> = self.buffer.drain(..).collect();
        while let Some(page) = self.next_page().await {
            match page {
                Ok(page) => issues.extend(page),
                Err(e) => {
                    self.buffer = issues.into();
                    return Err(e);
                }
            }
        }
        Ok(issues)
    }

    fn advance(&mut self, page: &SearchPage) {
        self.cursor = page.next_start();
        self.done = !page.has_more();
        debug!(
            "Search page fetched: {} issue(s), next cursor {}, total {}",
            page.issues.len(),
            self.cursor,
            page.total
        );
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::api::error::{ApiErrorKind, TransportError, TransportErrorKind};
    use crate::api::transport::mock::MockTransport;
    use crate::config::{ConnectionConfig, Credentials};

    fn client(transport: MockTransport) -> JiraClient<MockTransport> {
        let config = ConnectionConfig::new(
            "https://company.atlassian.net",
            Credentials::Bearer {
                token: "pat".to_string(),
            },
        )
        .unwrap();
        JiraClient::with_transport(config, transport)
    }

    fn issue(key: &str) -> Value {
        json!({
            "id": key.trim_start_matches("PROJ-"),
            "key": key,
            "fields": { "summary": format!("Issue {}", key), "status": { "name": "Open" } }
        })
    }

    fn page(start_at: u32, total: u32, keys: &[&str]) -> Value {
        json!({
            "startAt": start_at,
            "maxResults": 2,
            "total": total,
            "issues": keys.iter().map(|k| issue(k)).collect::<Vec<_>>()
        })
    }

    fn keys(issues: &[Issue]) -> Vec<String> {
        issues.iter().map(|i| i.key().to_string()).collect()
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(SearchQuery::new("x").page_size(0).page_size, 1);
        assert_eq!(SearchQuery::new("x").page_size(500).page_size, 100);
        assert_eq!(SearchQuery::new("x").page_size(25).page_size, 25);
    }

    #[tokio::test]
    async fn test_two_pages_in_order() {
        let transport = MockTransport::new()
            .respond_json(200, page(0, 4, &["PROJ-1", "PROJ-2"]))
            .respond_json(200, page(2, 4, &["PROJ-3", "PROJ-4"]));
        let client = client(transport);

        let mut search = client.search_issues(SearchQuery::new("project = PROJ").page_size(2));
        let mut seen = Vec::new();
        while let Some(issue) = search.next().await {
            seen.push(issue.unwrap().key().to_string());
        }

        assert_eq!(seen, vec!["PROJ-1", "PROJ-2", "PROJ-3", "PROJ-4"]);
        assert!(search.is_done());

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].query_param("startAt"), Some("0"));
        assert_eq!(requests[1].query_param("startAt"), Some("2"));
        assert_eq!(requests[1].query_param("maxResults"), Some("2"));
        assert_eq!(requests[1].query_param("jql"), Some("project = PROJ"));
    }

    #[tokio::test]
    async fn test_search_is_lazy() {
        let client = client(MockTransport::new());
        let search = client.search_issues(SearchQuery::new("project = PROJ"));

        assert_eq!(search.cursor(), 0);
        assert!(client.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_page_keeps_earlier_results_and_cursor() {
        let transport = MockTransport::new()
            .respond_json(200, page(0, 4, &["PROJ-1", "PROJ-2"]))
            .respond_json(503, json!({ "errorMessages": ["Service unavailable"] }))
            .respond_json(200, page(2, 4, &["PROJ-3", "PROJ-4"]));
        let client = client(transport);
        let mut search = client.search_issues(SearchQuery::new("project = PROJ").page_size(2));

        let first = search.next_page().await.unwrap().unwrap();
        assert_eq!(keys(&first), vec!["PROJ-1", "PROJ-2"]);

        let err = search.next_page().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Server);
        assert_eq!(search.cursor(), 2);

        let second = search.next_page().await.unwrap().unwrap();
        assert_eq!(keys(&second), vec!["PROJ-3", "PROJ-4"]);
        assert!(search.next_page().await.is_none());

        // The earlier page is untouched by the failure.
        assert_eq!(keys(&first), vec!["PROJ-1", "PROJ-2"]);
    }

    #[tokio::test]
    async fn test_collect_all_keeps_issues_across_a_failed_page() {
        let transport = MockTransport::new()
            .respond_json(200, page(0, 6, &["PROJ-1", "PROJ-2"]))
            .respond_json(503, json!({ "errorMessages": ["Service unavailable"] }))
            .respond_json(200, page(2, 6, &["PROJ-3", "PROJ-4"]))
            .respond_json(200, page(4, 6, &["PROJ-5", "PROJ-6"]));
        let client = client(transport);
        let mut search = client.search_issues(SearchQuery::new("project = PROJ").page_size(2));

        let err = search.collect_all().await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Server);
        assert_eq!(search.cursor(), 2);

        let all = search.collect_all().await.unwrap();
        assert_eq!(
            keys(&all),
            vec!["PROJ-1", "PROJ-2", "PROJ-3", "PROJ-4", "PROJ-5", "PROJ-6"]
        );
        assert!(search.is_done());
    }

    #[tokio::test]
    async fn test_network_failure_surfaces_as_network_error() {
        let transport = MockTransport::new().fail(
            TransportError::new(TransportErrorKind::Connect, "connection refused").with_attempts(4),
        );
        let client = client(transport);
        let mut search = client.search_issues(SearchQuery::new("project = PROJ"));

        let err = search.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Network);
        assert!(!search.is_done());
    }

    #[tokio::test]
    async fn test_restart_rewinds_to_initial_cursor() {
        let transport = MockTransport::new()
            .respond_json(200, page(10, 12, &["PROJ-11", "PROJ-12"]))
            .respond_json(200, page(10, 12, &["PROJ-11", "PROJ-12"]));
        let client = client(transport);
        let mut search =
            client.search_issues(SearchQuery::new("project = PROJ").start_at(10).page_size(2));

        let first = search.collect_all().await.unwrap();
        assert!(search.is_done());
        assert!(search.next().await.is_none());

        search.restart();
        assert_eq!(search.cursor(), 10);
        let again = search.collect_all().await.unwrap();

        assert_eq!(keys(&first), keys(&again));
        let requests = client.transport().requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.query_param("startAt") == Some("10")));
    }

    #[tokio::test]
    async fn test_empty_result_ends_immediately() {
        let transport = MockTransport::new().respond_json(200, page(0, 0, &[]));
        let client = client(transport);
        let mut search = client.search_issues(SearchQuery::new("project = EMPTY"));

        assert!(search.next().await.is_none());
        assert!(search.is_done());
        assert!(search.next_page().await.is_none());
        assert_eq!(client.transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_short_final_page() {
        let transport = MockTransport::new()
            .respond_json(200, page(0, 3, &["PROJ-1", "PROJ-2"]))
            .respond_json(200, page(2, 3, &["PROJ-3"]));
        let client = client(transport);
        let mut search = client.search_issues(SearchQuery::new("project = PROJ").page_size(2));

        let all = search.collect_all().await.unwrap();
        assert_eq!(keys(&all), vec!["PROJ-1", "PROJ-2", "PROJ-3"]);
        assert_eq!(client.transport().requests().len(), 2);
    }
}
