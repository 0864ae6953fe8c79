//! Translation of raw HTTP responses into API errors.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use serde_json::Value;

use super::error::{ApiError, Result};
use super::transport::RawResponse;

/// Header JIRA uses to identify a request in its logs.
pub const REQUEST_ID_HEADER: &str = "x-arequestid";

/// Classify a response as success or a typed [`ApiError`].
///
/// Total and deterministic: 2xx passes through, every other status maps to
/// exactly one error kind via [`ApiError::from_status`].
pub fn classify(response: RawResponse) -> Result<RawResponse> {
    if response.status.is_success() {
        return Ok(response);
    }

    let status = response.status;
    let message = error_message(&response.body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unexpected status").to_string());

    let retry_after = if status.as_u16() == 429 {
        response.header(RETRY_AFTER.as_str()).and_then(parse_retry_after)
    } else {
        None
    };

    let request_id = response.header(REQUEST_ID_HEADER).map(str::to_string);

    Err(ApiError::from_status(status, &message)
        .with_request_id(request_id)
        .with_retry_after(retry_after))
}

/// Extract JIRA's error details from a response body.
///
/// JIRA returns `{"errorMessages": [...], "errors": {"field": "reason"}}`.
fn error_message(body: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(body).ok()?;

    let mut parts: Vec<String> = json
        .get("errorMessages")
        .and_then(Value::as_array)
        .map(|messages| {
            messages
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if let Some(errors) = json.get("errors").and_then(Value::as_object) {
        parts.extend(errors.iter().map(|(field, reason)| {
            let reason = reason.as_str().map_or_else(|| reason.to_string(), str::to_string);
            format!("{}: {}", field, reason)
        }));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Parse a `Retry-After` header given in delta-seconds.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
