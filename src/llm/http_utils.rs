//! HTTP utilities for upstream providers
//!
//! Provides common HTTP request/response handling shared by the text and image
//! clients: a single POST attempt with status classification, and JSON path
//! extraction.

use crate::llm::UpstreamError;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;

/// Longest error body kept in an [`UpstreamError`] message
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Creates an HTTP client with the given default request timeout.
#[must_use]
pub fn create_http_client(timeout: Duration) -> HttpClient {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// Sends one HTTP POST request with a JSON body and returns the parsed JSON response.
///
/// # Arguments
/// * `client` - HTTP client to use
/// * `url` - Target URL
/// * `body` - JSON body to send
/// * `auth_header` - Optional authorization header value (e.g., "Bearer token")
/// * `extra_headers` - Additional headers as key-value pairs
/// * `timeout` - Per-request timeout, overriding the client default
///
/// # Errors
///
/// Returns the classified [`UpstreamError`]: `RateLimited`, `ClientError` or
/// `ServerError` for non-success statuses, `Timeout` or `Network` for transport
/// failures, `Decode` if the success body is not JSON.
pub async fn send_json_request(
    client: &HttpClient,
    url: &str,
    body: &Value,
    auth_header: Option<&str>,
    extra_headers: &[(&str, &str)],
    timeout: Duration,
) -> Result<Value, UpstreamError> {
    let mut request = client.post(url).json(body).timeout(timeout);

    if let Some(auth) = auth_header {
        request = request.header("Authorization", auth);
    }

    for (key, value) in extra_headers {
        request = request.header(*key, *value);
    }

    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(UpstreamError::from_status(
            status.as_u16(),
            clean_error_body(&error_text),
        ));
    }

    Ok(response.json().await?)
}

/// Shortens an error body and drops HTML error pages from proxies.
fn clean_error_body(error_text: &str) -> String {
    let trimmed = error_text.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        return "server returned an HTML error page".to_string();
    }

    if error_text.chars().count() > MAX_ERROR_BODY_CHARS {
        format!(
            "{}... (truncated)",
            crate::utils::truncate_str(error_text, MAX_ERROR_BODY_CHARS)
        )
    } else {
        error_text.to_string()
    }
}

/// Extracts text content from a JSON response by navigating a path.
///
/// # Arguments
/// * `response` - JSON response to extract from
/// * `path` - Path segments to navigate (supports string keys and numeric indices)
///
/// # Example
/// ```
/// use relay_chat_bot::llm::http_utils::extract_text_content;
/// use serde_json::json;
///
/// let response = json!({"choices": [{"message": {"content": "Привет"}}]});
/// let content = extract_text_content(&response, &["choices", "0", "message", "content"]);
/// assert_eq!(content.ok().as_deref(), Some("Привет"));
/// ```
///
/// # Errors
///
/// Returns `UpstreamError::Decode` if the path is invalid or the target is not a string.
pub fn extract_text_content(response: &Value, path: &[&str]) -> Result<String, UpstreamError> {
    let mut current = response;

    for segment in path {
        if let Ok(index) = segment.parse::<usize>() {
            current = current.get(index).ok_or_else(|| {
                UpstreamError::Decode(format!("Invalid path: missing index {index}"))
            })?;
        } else {
            current = current.get(*segment).ok_or_else(|| {
                UpstreamError::Decode(format!("Invalid path: missing key {segment}"))
            })?;
        }
    }

    current
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| UpstreamError::Decode(format!("Expected string at path, got: {current}")))
}
