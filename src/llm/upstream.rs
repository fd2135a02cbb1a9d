//! Retrying JSON client for one upstream endpoint.
//!
//! Both providers go through [`UpstreamClient`]: it owns the endpoint, the
//! credentials, the per-call timeout and the [`RetryPolicy`], and classifies every
//! failed attempt with [`UpstreamError::disposition`].

use super::http_utils::{create_http_client, send_json_request};
use super::{UpstreamError, UpstreamResult};
use crate::retry::{NoopObserver, RetryObserver, RetryPolicy};
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// HTTP JSON endpoint governed by a retry policy
#[derive(Clone)]
pub struct UpstreamClient {
    name: &'static str,
    http: HttpClient,
    endpoint: String,
    api_key: Option<String>,
    extra_headers: Vec<(&'static str, &'static str)>,
    timeout: Duration,
    policy: RetryPolicy,
}

impl UpstreamClient {
    /// Create a client for `endpoint`. Blank keys are treated as missing.
    #[must_use]
    pub fn new(
        name: &'static str,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            name,
            http: create_http_client(timeout),
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            extra_headers: Vec::new(),
            timeout,
            policy: RetryPolicy::default(),
        }
    }

    /// Add a static header to every request.
    #[must_use]
    pub fn with_header(mut self, key: &'static str, value: &'static str) -> Self {
        self.extra_headers.push((key, value));
        self
    }

    /// Replace the retry policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns true if an API key is configured.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Single attempt with an explicit timeout, no retries.
    ///
    /// # Errors
    ///
    /// Returns the classified [`UpstreamError`] of the attempt.
    pub async fn post_once(&self, body: &Value, timeout: Duration) -> Result<Value, UpstreamError> {
        let auth = self.api_key.as_ref().map(|k| format!("Bearer {k}"));
        send_json_request(
            &self.http,
            &self.endpoint,
            body,
            auth.as_deref(),
            &self.extra_headers,
            timeout,
        )
        .await
    }

    /// POST `body` under the retry policy.
    ///
    /// # Errors
    ///
    /// Returns `RetryError::Aborted` for non-retryable failures and
    /// `RetryError::Exhausted` when every attempt failed.
    pub async fn call(&self, body: &Value) -> UpstreamResult<Value> {
        self.call_observed(body, &NoopObserver).await
    }

    /// Like [`UpstreamClient::call`], reporting each retry to `observer`.
    ///
    /// # Errors
    ///
    /// Same as [`UpstreamClient::call`].
    #[instrument(skip(self, body, observer), fields(upstream = self.name))]
    pub async fn call_observed(
        &self,
        body: &Value,
        observer: &dyn RetryObserver<UpstreamError>,
    ) -> UpstreamResult<Value> {
        debug!(endpoint = %self.endpoint, "Sending upstream request");
        let start = std::time::Instant::now();

        let result = self
            .policy
            .run(
                || self.post_once(body, self.timeout),
                UpstreamError::disposition,
                observer,
            )
            .await;

        debug!(
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            ok = result.is_ok(),
            "Upstream request finished"
        );
        result
    }
}
