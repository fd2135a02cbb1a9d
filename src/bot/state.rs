//! Per-user conversation state
//!
//! Every user is either chatting freely or has asked for an image and the next
//! text they send is the prompt. States live in a bounded in-memory store and
//! expire after a long idle period; nothing survives a restart.

use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

/// Represents the current state of the user dialogue
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum State {
    /// Normal chat, every text goes to the completion API
    #[default]
    Idle,
    /// The next text is an image prompt
    AwaitingImagePrompt,
}

/// Keyed store of conversation states with create-on-first-access
///
/// Entries are dropped after `idle_ttl` without access, which is
/// indistinguishable from [`State::Idle`] for the user.
#[derive(Clone)]
pub struct ConversationStore {
    cache: Cache<i64, State>,
}

impl ConversationStore {
    /// Creates a store whose entries expire after `idle_ttl` without access.
    ///
    /// # Examples
    ///
    /// ```
    /// use relay_chat_bot::bot::state::{ConversationStore, State};
    /// use std::time::Duration;
    ///
    /// # async fn example() {
    /// let store = ConversationStore::new(Duration::from_secs(3600), 1_000);
    /// assert_eq!(store.get(42).await, State::Idle);
    /// # }
    /// ```
    #[must_use]
    pub fn new(idle_ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(idle_ttl)
            .build();
        Self { cache }
    }

    /// Current state of `user_id`, creating an `Idle` entry if none exists.
    pub async fn get(&self, user_id: i64) -> State {
        self.cache.get_with(user_id, async { State::Idle }).await
    }

    /// Moves `user_id` to `state`.
    pub async fn set(&self, user_id: i64, state: State) {
        debug!(user_id, ?state, "Conversation state changed");
        self.cache.insert(user_id, state).await;
    }

    /// Returns `user_id` to [`State::Idle`].
    pub async fn reset(&self, user_id: i64) {
        self.set(user_id, State::Idle).await;
    }
}
