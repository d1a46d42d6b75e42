//! Chat domain entities

use super::value_objects::{ChatId, MessageId};
use crate::completion::entities::CompletionMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persistent conversation between one user and one avatar (Entity)
///
/// Created once per (user, avatar) pair, on the first message the user sends.
/// The store bumps `modified_at` whenever a message is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatThread {
    pub id: ChatId,
    pub user_id: String,
    pub avatar_id: String,
    #[serde(rename = "date_created")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "date_modified")]
    pub modified_at: DateTime<Utc>,
}

impl ChatThread {
    /// Create a new thread for a (user, avatar) pair, timestamped now.
    pub fn new(user_id: impl Into<String>, avatar_id: impl Into<String>) -> Self {
        Self::new_at(user_id, avatar_id, Utc::now())
    }

    pub fn new_at(
        user_id: impl Into<String>,
        avatar_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let user_id = user_id.into();
        let avatar_id = avatar_id.into();
        Self {
            id: ChatId::for_pair(&user_id, &avatar_id),
            user_id,
            avatar_id,
            created_at: now,
            modified_at: now,
        }
    }

    /// Record that a message was added at `at`. Never moves time backwards.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.modified_at {
            self.modified_at = at;
        }
    }

    /// Whether this thread belongs to the given (user, avatar) pair
    pub fn is_for(&self, user_id: &str, avatar_id: &str) -> bool {
        self.user_id == user_id && self.avatar_id == avatar_id
    }
}

/// A single message in a chat thread (Entity)
///
/// Messages are append-only; only `seen_by_ids` may change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    /// `None` for system-originated messages
    pub author_id: Option<String>,
    pub content: Option<CompletionMessage>,
    #[serde(default)]
    pub seen_by_ids: Vec<String>,
    #[serde(rename = "date_created")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// A message written by the user
    pub fn user(chat_id: ChatId, user_id: impl Into<String>, text: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            id: MessageId::generate(),
            chat_id,
            seen_by_ids: vec![user_id.clone()],
            author_id: Some(user_id),
            content: Some(CompletionMessage::user(text)),
            created_at: Utc::now(),
        }
    }

    /// A reply generated for the avatar, authored by the avatar id
    pub fn assistant(chat_id: ChatId, avatar_id: impl Into<String>, reply: CompletionMessage) -> Self {
        Self {
            id: MessageId::generate(),
            chat_id,
            author_id: Some(avatar_id.into()),
            content: Some(reply),
            seen_by_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Override the creation timestamp
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    pub fn has_been_seen_by(&self, user_id: &str) -> bool {
        self.seen_by_ids.iter().any(|id| id == user_id)
    }

    /// Text content, if any
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().map(|c| c.text.as_str())
    }
}

/// A user's report against a chat thread (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReport {
    pub id: String,
    pub chat_id: ChatId,
    pub user_id: String,
    pub is_active: bool,
    #[serde(rename = "date_created")]
    pub created_at: DateTime<Utc>,
}

impl ChatReport {
    pub fn new(chat_id: ChatId, user_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id,
            user_id: user_id.into(),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
