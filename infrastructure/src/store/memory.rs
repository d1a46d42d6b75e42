//! In-memory chat store
//!
//! Keeps threads, messages and reports in process memory and pushes a fresh
//! snapshot to every live subscriber whenever a thread's messages change,
//! the way a document database with snapshot listeners does.
//!
//! Each thread owns a `watch` channel holding its latest snapshot. A
//! subscription is a small forwarding task from that channel into the
//! subscriber's `mpsc` channel; the task ends when the subscriber drops its
//! [`MessageSubscription`].

use async_trait::async_trait;
use avachat_application::{ChatStore, MessageSubscription, SnapshotResult, StoreError};
use avachat_domain::{ChatId, ChatMessage, ChatReport, ChatThread};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

const SUBSCRIPTION_BUFFER: usize = 16;

#[derive(Default)]
struct Tables {
    threads: HashMap<ChatId, ChatThread>,
    messages: HashMap<ChatId, Vec<ChatMessage>>,
    reports: Vec<ChatReport>,
    feeds: HashMap<ChatId, watch::Sender<SnapshotResult>>,
}

impl Tables {
    fn snapshot(&self, chat_id: &ChatId) -> Vec<ChatMessage> {
        self.messages.get(chat_id).cloned().unwrap_or_default()
    }

    fn feed(&mut self, chat_id: &ChatId) -> &watch::Sender<SnapshotResult> {
        let initial = self.snapshot(chat_id);
        self.feeds
            .entry(chat_id.clone())
            .or_insert_with(|| watch::Sender::new(Ok(initial)))
    }

    /// Drop feeds nobody listens to anymore
    fn prune_feeds(&mut self) {
        self.feeds.retain(|_, feed| feed.receiver_count() > 0);
    }

    /// Publish the final (empty) snapshot of a deleted thread and drop its
    /// feed, which ends the subscriptions once that snapshot is delivered.
    fn retire(&mut self, chat_id: &ChatId) {
        self.publish(chat_id);
        self.feeds.remove(chat_id);
    }

    fn publish(&mut self, chat_id: &ChatId) {
        let snapshot = self.snapshot(chat_id);
        if let Some(feed) = self.feeds.get(chat_id) {
            feed.send_replace(Ok(snapshot));
        }
    }
}

/// [`ChatStore`] backed by process memory
#[derive(Default)]
pub struct InMemoryChatStore {
    tables: RwLock<Tables>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every live subscription of `chat_id` with
    /// [`StoreError::Disconnected`], as a dropped connection would.
    pub fn disconnect(&self, chat_id: &ChatId) {
        let mut tables = self.write();
        if let Some(feed) = tables.feeds.remove(chat_id) {
            debug!("Disconnecting subscribers of {}", chat_id);
            feed.send_replace(Err(StoreError::Disconnected(format!(
                "subscription to {} was closed by the store",
                chat_id
            ))));
        }
    }

    pub fn reports(&self) -> Vec<ChatReport> {
        self.read().reports.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Forward every change of `feed` to `tx` until either side goes away.
///
/// An error ends the subscription after it is delivered.
async fn forward(mut feed: watch::Receiver<SnapshotResult>, tx: mpsc::Sender<SnapshotResult>) {
    loop {
        let item = feed.borrow_and_update().clone();
        let failed = item.is_err();
        if tx.send(item).await.is_err() || failed {
            break;
        }
        tokio::select! {
            _ = tx.closed() => break,
            changed = feed.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    trace!("Subscription forwarder finished");
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn find_thread(
        &self,
        user_id: &str,
        avatar_id: &str,
    ) -> Result<Option<ChatThread>, StoreError> {
        Ok(self
            .read()
            .threads
            .values()
            .find(|t| t.is_for(user_id, avatar_id))
            .cloned())
    }

    async fn create_thread(&self, thread: &ChatThread) -> Result<(), StoreError> {
        let mut tables = self.write();
        if tables.threads.contains_key(&thread.id) {
            return Err(StoreError::Conflict(format!(
                "thread {} already exists",
                thread.id
            )));
        }
        tables.threads.insert(thread.id.clone(), thread.clone());
        debug!("Created thread {}", thread.id);
        Ok(())
    }

    async fn append_message(
        &self,
        chat_id: &ChatId,
        message: &ChatMessage,
    ) -> Result<(), StoreError> {
        let mut tables = self.write();
        let Some(thread) = tables.threads.get_mut(chat_id) else {
            return Err(StoreError::NotFound(format!("thread {}", chat_id)));
        };
        thread.touch(message.created_at);
        tables
            .messages
            .entry(chat_id.clone())
            .or_default()
            .push(message.clone());
        tables.publish(chat_id);
        trace!("Appended {} to {}", message.id, chat_id);
        Ok(())
    }

    async fn subscribe_messages(
        &self,
        chat_id: &ChatId,
    ) -> Result<MessageSubscription, StoreError> {
        let feed = {
            let mut tables = self.write();
            tables.prune_feeds();
            tables.feed(chat_id).subscribe()
        };
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(forward(feed, tx));
        debug!("New subscription to {}", chat_id);
        Ok(MessageSubscription::new(rx))
    }

    async fn list_threads(&self, user_id: &str) -> Result<Vec<ChatThread>, StoreError> {
        Ok(self
            .read()
            .threads
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn last_message(&self, chat_id: &ChatId) -> Result<Option<ChatMessage>, StoreError> {
        Ok(self
            .read()
            .messages
            .get(chat_id)
            .and_then(|messages| messages.iter().max_by_key(|m| m.created_at))
            .cloned())
    }

    async fn delete_thread(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        let mut tables = self.write();
        tables.threads.remove(chat_id);
        tables.messages.remove(chat_id);
        tables.retire(chat_id);
        debug!("Deleted thread {}", chat_id);
        Ok(())
    }

    async fn delete_threads_for_user(&self, user_id: &str) -> Result<(), StoreError> {
        let mut tables = self.write();
        let ids: Vec<ChatId> = tables
            .threads
            .values()
            .filter(|t| t.user_id == user_id)
            .map(|t| t.id.clone())
            .collect();
        for id in &ids {
            tables.threads.remove(id);
            tables.messages.remove(id);
            tables.retire(id);
        }
        debug!("Deleted {} threads of {}", ids.len(), user_id);
        Ok(())
    }

    async fn file_report(&self, report: &ChatReport) -> Result<(), StoreError> {
        self.write().reports.push(report.clone());
        Ok(())
    }
}
