//! Test doubles shared by the unit tests.

use crate::bot::handlers::{BotContext, IncomingText};
use crate::bot::state::ConversationStore;
use crate::bot::transport::{ChatActionKind, ChatTransport, ReplyKeyboard};
use crate::liveness::ActivityClock;
use crate::llm::{ImageProvider, MockTextProvider, UpstreamError, UpstreamResult};
use crate::retry::{RetryAttempt, RetryObserver};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const USER_ID: i64 = 100;
pub const CHAT_ID: i64 = 200;

/// Everything a handler pushed through the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        text: String,
        keyboard: Option<ReplyKeyboard>,
    },
    Action(ChatActionKind),
    Photo {
        bytes: Vec<u8>,
        caption: String,
    },
}

/// Transport that records outbound traffic instead of talking to Telegram
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    fail_photos: bool,
}

impl RecordingTransport {
    pub fn failing_photos() -> Self {
        Self {
            fail_photos: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn texts(&self) -> Vec<(String, Option<ReplyKeyboard>)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, keyboard } => Some((text, keyboard)),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop().map(|(text, _)| text)
    }

    fn push(&self, item: Sent) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(item);
        }
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(
        &self,
        _chat_id: i64,
        text: &str,
        keyboard: Option<ReplyKeyboard>,
    ) -> Result<()> {
        self.push(Sent::Text {
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn send_chat_action(&self, _chat_id: i64, action: ChatActionKind) -> Result<()> {
        self.push(Sent::Action(action));
        Ok(())
    }

    async fn send_photo(
        &self,
        _chat_id: i64,
        image: &[u8],
        caption: &str,
        _keyboard: Option<ReplyKeyboard>,
    ) -> Result<()> {
        if self.fail_photos {
            return Err(anyhow::anyhow!("photo upload failed"));
        }
        self.push(Sent::Photo {
            bytes: image.to_vec(),
            caption: caption.to_string(),
        });
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Image provider returning a canned outcome, optionally after reporting
/// rate-limited retries to the observer
pub struct ScriptedImageProvider {
    outcome: UpstreamResult<Vec<Vec<u8>>>,
    rate_limited_retries: u32,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedImageProvider {
    pub fn returning(outcome: UpstreamResult<Vec<Vec<u8>>>) -> Self {
        Self {
            outcome,
            rate_limited_retries: 0,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unused() -> Self {
        Self::returning(Ok(Vec::new()))
    }

    pub const fn after_rate_limits(mut self, retries: u32) -> Self {
        self.rate_limited_retries = retries;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ImageProvider for ScriptedImageProvider {
    async fn generate_image(
        &self,
        prompt: &str,
        observer: &dyn RetryObserver<UpstreamError>,
    ) -> UpstreamResult<Vec<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        for attempt in 1..=self.rate_limited_retries {
            observer
                .on_retry(&RetryAttempt {
                    attempt_number: attempt,
                    delay_before_next: Duration::from_secs(u64::from(attempt) * 2),
                    error: &UpstreamError::RateLimited,
                })
                .await;
        }

        self.outcome.clone()
    }
}

pub fn context(text: MockTextProvider, image: Arc<ScriptedImageProvider>) -> BotContext {
    BotContext {
        conversations: ConversationStore::new(Duration::from_secs(3600), 1_000),
        activity: Arc::new(ActivityClock::new()),
        text: Arc::new(text),
        image,
        bot_username: "relay_test_bot".to_string(),
    }
}

pub fn incoming(text: &str) -> IncomingText {
    IncomingText {
        user_id: USER_ID,
        chat_id: CHAT_ID,
        text: text.to_string(),
    }
}
