use crate::config::{Settings, IMAGE_API_TIMEOUT_SECS};
use crate::llm::upstream::UpstreamClient;
use crate::llm::{ImageProvider, UpstreamError, UpstreamResult};
use crate::retry::{RetryError, RetryObserver, RetryPolicy};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

const CFG_SCALE: u32 = 7;
const IMAGE_SIDE: u32 = 1024;
const SAMPLES: u32 = 1;
const STEPS: u32 = 30;
const PROMPT_WEIGHT: f64 = 1.0;

#[derive(Deserialize, Debug)]
struct Artifact {
    base64: String,
}

#[derive(Deserialize, Debug)]
struct TextToImageResponse {
    artifacts: Vec<Artifact>,
}

/// Image provider backed by the Stability AI text-to-image endpoint
#[derive(Clone)]
pub struct StabilityProvider {
    upstream: UpstreamClient,
}

impl StabilityProvider {
    /// Create a new provider instance
    #[must_use]
    pub fn new(api_key: Option<String>, endpoint: &str) -> Self {
        Self {
            upstream: UpstreamClient::new(
                "stability",
                endpoint,
                api_key,
                Duration::from_secs(IMAGE_API_TIMEOUT_SECS),
            )
            .with_header("Accept", "application/json"),
        }
    }

    /// Create a provider from application settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.stability_api_key.clone(), &settings.image_api_url)
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.upstream = self.upstream.with_policy(policy);
        self
    }

    /// Replace the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.upstream = self.upstream.with_timeout(timeout);
        self
    }

    fn request_body(prompt: &str) -> Value {
        json!({
            "text_prompts": [
                {"text": prompt, "weight": PROMPT_WEIGHT}
            ],
            "cfg_scale": CFG_SCALE,
            "height": IMAGE_SIDE,
            "width": IMAGE_SIDE,
            "samples": SAMPLES,
            "steps": STEPS
        })
    }

    fn decode_artifacts(response: Value) -> Result<Vec<Vec<u8>>, UpstreamError> {
        let parsed: TextToImageResponse = serde_json::from_value(response)
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        if parsed.artifacts.is_empty() {
            return Err(UpstreamError::Decode(
                "response contains no artifacts".to_string(),
            ));
        }

        parsed
            .artifacts
            .iter()
            .map(|artifact| {
                BASE64
                    .decode(artifact.base64.as_bytes())
                    .map_err(|e| UpstreamError::Decode(format!("invalid base64 image: {e}")))
            })
            .collect()
    }
}

#[async_trait]
impl ImageProvider for StabilityProvider {
    async fn generate_image(
        &self,
        prompt: &str,
        observer: &dyn RetryObserver<UpstreamError>,
    ) -> UpstreamResult<Vec<Vec<u8>>> {
        if !self.upstream.has_credentials() {
            return Err(RetryError::Aborted(UpstreamError::Configuration(
                "STABILITY_API_KEY is not set".to_string(),
            )));
        }

        let response = self
            .upstream
            .call_observed(&Self::request_body(prompt), observer)
            .await?;
        let images = Self::decode_artifacts(response).map_err(RetryError::Aborted)?;

        info!(count = images.len(), "Images generated");
        Ok(images)
    }
}
