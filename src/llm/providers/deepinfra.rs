use crate::config::{Settings, PROBE_TIMEOUT_SECS, TEXT_API_TIMEOUT_SECS};
use crate::llm::http_utils::extract_text_content;
use crate::llm::upstream::UpstreamClient;
use crate::llm::{TextProvider, UpstreamResult};
use crate::retry::{RetryError, RetryPolicy};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

const CHAT_SYSTEM_PROMPT: &str = "Ты полезный ассистент. Отвечай на русском языке.";
const TRANSLATE_SYSTEM_PROMPT: &str = "Ты переводчик с русского на английский. \
     Переведи текст пользователя на английский язык. \
     Дай только перевод без дополнительных комментариев.";

const CHAT_MAX_TOKENS: u32 = 800;
const CHAT_TEMPERATURE: f64 = 0.7;
const TRANSLATE_MAX_TOKENS: u32 = 500;
const TRANSLATE_TEMPERATURE: f64 = 0.3;

const CONTENT_PATH: [&str; 4] = ["choices", "0", "message", "content"];

/// Text provider backed by an OpenAI-compatible chat-completions endpoint
#[derive(Clone)]
pub struct DeepInfraProvider {
    upstream: UpstreamClient,
    model: String,
}

impl DeepInfraProvider {
    /// Create a new provider instance
    #[must_use]
    pub fn new(api_key: Option<String>, endpoint: &str, model: &str) -> Self {
        Self {
            upstream: UpstreamClient::new(
                "deepinfra",
                endpoint,
                api_key,
                Duration::from_secs(TEXT_API_TIMEOUT_SECS),
            ),
            model: model.to_string(),
        }
    }

    /// Create a provider from application settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.deepinfra_api_key.clone(),
            &settings.text_api_url,
            &settings.text_model,
        )
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

    fn completion_body(
        &self,
        system_prompt: &str,
        user_message: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_message}
            ],
            "max_tokens": max_tokens,
            "temperature": temperature
        })
    }

    async fn complete(&self, body: &Value) -> UpstreamResult<String> {
        let response = self.upstream.call(body).await?;
        extract_text_content(&response, &CONTENT_PATH).map_err(RetryError::Aborted)
    }

    /// One-shot availability check with a short timeout. Never retried.
    pub async fn probe(&self) -> bool {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are a helpful assistant."},
                {"role": "user", "content": "Hello"}
            ],
            "max_tokens": 10
        });

        match self
            .upstream
            .post_once(&body, Duration::from_secs(PROBE_TIMEOUT_SECS))
            .await
        {
            Ok(_) => {
                info!("Text API is available");
                true
            }
            Err(e) => {
                warn!(error = %e, "Text API is not available");
                false
            }
        }
    }
}

#[async_trait]
impl TextProvider for DeepInfraProvider {
    async fn chat(&self, user_message: &str) -> UpstreamResult<String> {
        let body = self.completion_body(
            CHAT_SYSTEM_PROMPT,
            user_message,
            CHAT_MAX_TOKENS,
            CHAT_TEMPERATURE,
        );
        self.complete(&body).await
    }

    async fn translate(&self, text: &str) -> String {
        let body = self.completion_body(
            TRANSLATE_SYSTEM_PROMPT,
            text,
            TRANSLATE_MAX_TOKENS,
            TRANSLATE_TEMPERATURE,
        );

        match self.complete(&body).await {
            Ok(translation) if !translation.trim().is_empty() => {
                info!("Translation received");
                translation.trim().to_string()
            }
            Ok(_) => {
                warn!("Empty translation, using source text");
                text.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Translation failed, using source text");
                text.to_string()
            }
        }
    }
}
