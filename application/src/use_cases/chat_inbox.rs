//! Chat Inbox use case
//!
//! Everything a user can do with their chats outside an open chat screen:
//! list them with a preview of the last message, delete them, and report
//! one for moderation.

use crate::ports::chat_store::{ChatStore, StoreError};
use avachat_domain::{ChatId, ChatMessage, ChatReport, ChatThread};
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatInboxError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// One row of the inbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub thread: ChatThread,
    /// `None` when the thread is empty or the lookup failed
    pub last_message: Option<ChatMessage>,
}

pub struct ChatInboxUseCase {
    store: Arc<dyn ChatStore>,
}

impl ChatInboxUseCase {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// All threads of `user_id`, most recently active first.
    ///
    /// Last messages are fetched concurrently. A failed fetch only blanks
    /// that row's preview.
    pub async fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummary>, ChatInboxError> {
        let mut threads = self.store.list_threads(user_id).await?;
        threads.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        debug!("Listing {} chats for {}", threads.len(), user_id);

        let previews = join_all(threads.iter().map(|t| self.store.last_message(&t.id))).await;

        Ok(threads
            .into_iter()
            .zip(previews)
            .map(|(thread, last)| {
                let last_message = match last {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("Failed to load last message of {}: {}", thread.id, e);
                        None
                    }
                };
                ChatSummary {
                    thread,
                    last_message,
                }
            })
            .collect())
    }

    /// Delete one thread and its messages
    pub async fn delete_chat(&self, chat_id: &ChatId) -> Result<(), ChatInboxError> {
        self.store.delete_thread(chat_id).await?;
        info!("Deleted chat {}", chat_id);
        Ok(())
    }

    /// Delete every thread of `user_id`, e.g. when the account goes away
    pub async fn delete_all_chats_for_user(&self, user_id: &str) -> Result<(), ChatInboxError> {
        self.store.delete_threads_for_user(user_id).await?;
        info!("Deleted all chats of {}", user_id);
        Ok(())
    }

    /// File a moderation report against a chat and return it
    pub async fn report_chat(
        &self,
        chat_id: &ChatId,
        user_id: &str,
    ) -> Result<ChatReport, ChatInboxError> {
        let report = ChatReport::new(chat_id.clone(), user_id);
        self.store.file_report(&report).await?;
        info!("Filed report {} for chat {}", report.id, chat_id);
        Ok(report)
    }
}
