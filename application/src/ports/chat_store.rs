//! Chat Store port
//!
//! Defines the interface for persisting chat threads and messages and for
//! following a thread's messages live.

use async_trait::async_trait;
use avachat_domain::{ChatId, ChatMessage, ChatReport, ChatThread};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during chat store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Subscription disconnected: {0}")]
    Disconnected(String),
}

/// One item of a live subscription: a full message list, or the error that ended it.
pub type SnapshotResult = Result<Vec<ChatMessage>, StoreError>;

/// Live sequence of message-list snapshots for one thread.
///
/// Wraps an `mpsc::Receiver<SnapshotResult>`. Snapshots arrive in no
/// particular message order. Dropping the subscription stops the producer.
pub struct MessageSubscription {
    receiver: mpsc::Receiver<SnapshotResult>,
}

impl MessageSubscription {
    pub fn new(receiver: mpsc::Receiver<SnapshotResult>) -> Self {
        Self { receiver }
    }

    /// Wait for the next snapshot. `None` once the producer has stopped.
    pub async fn recv(&mut self) -> Option<SnapshotResult> {
        self.receiver.recv().await
    }
}

impl Stream for MessageSubscription {
    type Item = SnapshotResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Persistence for chat threads, messages and reports
///
/// This port defines how the application layer talks to the document store.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Find the thread for a (user, avatar) pair
    async fn find_thread(
        &self,
        user_id: &str,
        avatar_id: &str,
    ) -> Result<Option<ChatThread>, StoreError>;

    /// Create a thread. Fails with [`StoreError::Conflict`] if it already exists.
    async fn create_thread(&self, thread: &ChatThread) -> Result<(), StoreError>;

    /// Append a message to a thread and bump the thread's modification time
    async fn append_message(&self, chat_id: &ChatId, message: &ChatMessage)
    -> Result<(), StoreError>;

    /// Follow a thread's messages. The first item is the current list.
    async fn subscribe_messages(&self, chat_id: &ChatId)
    -> Result<MessageSubscription, StoreError>;

    /// All threads owned by a user, in no particular order
    async fn list_threads(&self, user_id: &str) -> Result<Vec<ChatThread>, StoreError>;

    /// Most recently created message of a thread
    async fn last_message(&self, chat_id: &ChatId) -> Result<Option<ChatMessage>, StoreError>;

    /// Delete a thread together with its messages
    async fn delete_thread(&self, chat_id: &ChatId) -> Result<(), StoreError>;

    /// Delete every thread owned by a user
    async fn delete_threads_for_user(&self, user_id: &str) -> Result<(), StoreError>;

    /// Store a report against a thread
    async fn file_report(&self, report: &ChatReport) -> Result<(), StoreError>;
}
