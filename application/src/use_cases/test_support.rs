//! Mock adapters shared by use case tests.

use crate::ports::avatar_directory::{AvatarDirectory, AvatarError};
use crate::ports::chat_observer::{ChatObserver, FailureKind};
use crate::ports::chat_store::{ChatStore, MessageSubscription, SnapshotResult, StoreError};
use crate::ports::completion_backend::{CompletionBackend, CompletionError};
use async_trait::async_trait;
use avachat_domain::{Avatar, ChatId, ChatMessage, ChatReport, ChatThread, CompletionMessage};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// In-process store that records every call.
///
/// With `echo` enabled (the default) every append is pushed to live
/// subscribers, like a document database would.
pub(crate) struct MockStore {
    threads: Mutex<HashMap<ChatId, ChatThread>>,
    messages: Mutex<Vec<ChatMessage>>,
    reports: Mutex<Vec<ChatReport>>,
    subscribers: Mutex<Vec<(ChatId, mpsc::Sender<SnapshotResult>)>>,
    calls: Mutex<Vec<String>>,
    echo: bool,
    fail_find: bool,
    find_delay: Option<Duration>,
    fail_append_after: Option<usize>,
    fail_last_message: Option<ChatId>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            threads: Mutex::new(HashMap::new()),
            messages: Mutex::new(Vec::new()),
            reports: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            echo: true,
            fail_find: false,
            find_delay: None,
            fail_append_after: None,
            fail_last_message: None,
        }
    }

    pub fn without_echo(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn failing_find(mut self) -> Self {
        self.fail_find = true;
        self
    }

    /// Make every thread lookup take `delay`
    pub fn with_find_delay(mut self, delay: Duration) -> Self {
        self.find_delay = Some(delay);
        self
    }

    /// Let `count` appends succeed, then fail every following one
    pub fn failing_append_after(mut self, count: usize) -> Self {
        self.fail_append_after = Some(count);
        self
    }

    pub fn failing_last_message_for(mut self, chat_id: ChatId) -> Self {
        self.fail_last_message = Some(chat_id);
        self
    }

    pub fn with_thread(self, thread: ChatThread) -> Self {
        self.threads
            .lock()
            .unwrap()
            .insert(thread.id.clone(), thread);
        self
    }

    pub fn with_message(self, message: ChatMessage) -> Self {
        self.messages.lock().unwrap().push(message);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of create/append/delete/report calls
    pub fn write_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| {
                c.starts_with("create") || c.starts_with("append") || c.starts_with("delete")
                    || c.starts_with("report")
            })
            .count()
    }

    pub fn appended(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn thread(&self, chat_id: &ChatId) -> Option<ChatThread> {
        self.threads.lock().unwrap().get(chat_id).cloned()
    }

    pub fn reports(&self) -> Vec<ChatReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, tx)| !tx.is_closed())
            .count()
    }

    /// Deliver a hand-made snapshot to every live subscriber of `chat_id`
    pub async fn push(&self, chat_id: &ChatId, item: SnapshotResult) {
        let senders: Vec<_> = self
            .subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == chat_id)
            .map(|(_, tx)| tx.clone())
            .collect();
        for tx in senders {
            let _ = tx.send(item.clone()).await;
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn messages_for(&self, chat_id: &ChatId) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| &m.chat_id == chat_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChatStore for MockStore {
    async fn find_thread(
        &self,
        user_id: &str,
        avatar_id: &str,
    ) -> Result<Option<ChatThread>, StoreError> {
        self.record(format!("find {} {}", user_id, avatar_id));
        if let Some(delay) = self.find_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_find {
            return Err(StoreError::ReadFailed("offline".to_string()));
        }
        Ok(self
            .threads
            .lock()
            .unwrap()
            .values()
            .find(|t| t.is_for(user_id, avatar_id))
            .cloned())
    }

    async fn create_thread(&self, thread: &ChatThread) -> Result<(), StoreError> {
        self.record(format!("create {}", thread.id));
        let mut threads = self.threads.lock().unwrap();
        if threads.contains_key(&thread.id) {
            return Err(StoreError::Conflict(thread.id.to_string()));
        }
        threads.insert(thread.id.clone(), thread.clone());
        Ok(())
    }

    async fn append_message(
        &self,
        chat_id: &ChatId,
        message: &ChatMessage,
    ) -> Result<(), StoreError> {
        let appended_so_far = self
            .calls()
            .iter()
            .filter(|c| c.starts_with("append"))
            .count();
        self.record(format!("append {}", chat_id));
        if let Some(limit) = self.fail_append_after
            && appended_so_far >= limit
        {
            return Err(StoreError::WriteFailed("quota exceeded".to_string()));
        }
        self.messages.lock().unwrap().push(message.clone());
        if let Some(thread) = self.threads.lock().unwrap().get_mut(chat_id) {
            thread.touch(message.created_at);
        }
        if self.echo {
            let snapshot = self.messages_for(chat_id);
            self.push(chat_id, Ok(snapshot)).await;
        }
        Ok(())
    }

    async fn subscribe_messages(
        &self,
        chat_id: &ChatId,
    ) -> Result<MessageSubscription, StoreError> {
        self.record(format!("subscribe {}", chat_id));
        let (tx, rx) = mpsc::channel(16);
        let _ = tx.try_send(Ok(self.messages_for(chat_id)));
        self.subscribers
            .lock()
            .unwrap()
            .push((chat_id.clone(), tx));
        Ok(MessageSubscription::new(rx))
    }

    async fn list_threads(&self, user_id: &str) -> Result<Vec<ChatThread>, StoreError> {
        self.record(format!("list {}", user_id));
        Ok(self
            .threads
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn last_message(&self, chat_id: &ChatId) -> Result<Option<ChatMessage>, StoreError> {
        self.record(format!("last {}", chat_id));
        if self.fail_last_message.as_ref() == Some(chat_id) {
            return Err(StoreError::ReadFailed("index missing".to_string()));
        }
        Ok(self
            .messages_for(chat_id)
            .into_iter()
            .max_by_key(|m| m.created_at))
    }

    async fn delete_thread(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        self.record(format!("delete {}", chat_id));
        self.threads.lock().unwrap().remove(chat_id);
        self.messages.lock().unwrap().retain(|m| &m.chat_id != chat_id);
        Ok(())
    }

    async fn delete_threads_for_user(&self, user_id: &str) -> Result<(), StoreError> {
        self.record(format!("delete-all {}", user_id));
        let removed: Vec<ChatId> = {
            let mut threads = self.threads.lock().unwrap();
            let ids: Vec<ChatId> = threads
                .values()
                .filter(|t| t.user_id == user_id)
                .map(|t| t.id.clone())
                .collect();
            for id in &ids {
                threads.remove(id);
            }
            ids
        };
        self.messages
            .lock()
            .unwrap()
            .retain(|m| !removed.contains(&m.chat_id));
        Ok(())
    }

    async fn file_report(&self, report: &ChatReport) -> Result<(), StoreError> {
        self.record(format!("report {}", report.chat_id));
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// Backend that replays scripted results and records every request.
pub(crate) struct MockBackend {
    replies: Mutex<VecDeque<Result<CompletionMessage, CompletionError>>>,
    requests: Mutex<Vec<Vec<CompletionMessage>>>,
    store: Option<Arc<MockStore>>,
    store_messages_at_call: Mutex<Vec<usize>>,
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new(replies: Vec<Result<CompletionMessage, CompletionError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            store: None,
            store_messages_at_call: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(CompletionMessage::assistant(text))])
    }

    /// Remember how many messages `store` held each time a reply is requested
    pub fn watching(mut self, store: Arc<MockStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<Vec<CompletionMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn store_messages_at_call(&self) -> Vec<usize> {
        self.store_messages_at_call.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn generate_reply(
        &self,
        messages: &[CompletionMessage],
    ) -> Result<CompletionMessage, CompletionError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if let Some(store) = &self.store {
            self.store_messages_at_call
                .lock()
                .unwrap()
                .push(store.appended().len());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::RequestFailed("no more replies".to_string())))
    }
}

pub(crate) struct MockAvatars {
    avatars: HashMap<String, Avatar>,
}

impl MockAvatars {
    pub fn new(avatars: Vec<Avatar>) -> Self {
        Self {
            avatars: avatars.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }
}

#[async_trait]
impl AvatarDirectory for MockAvatars {
    async fn get_avatar(&self, avatar_id: &str) -> Result<Avatar, AvatarError> {
        self.avatars
            .get(avatar_id)
            .cloned()
            .ok_or_else(|| AvatarError::NotFound(avatar_id.to_string()))
    }
}

/// Observer that records event names in order.
#[derive(Default)]
pub(crate) struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ChatObserver for RecordingObserver {
    fn on_open(&self, _user_id: &str, _avatar_id: &str, thread: Option<&ChatThread>) {
        self.push(format!("open {}", thread.is_some()));
    }

    fn on_send_start(&self, _chat_id: Option<&ChatId>, text: &str) {
        self.push(format!("send_start {}", text));
    }

    fn on_send_success(&self, _chat_id: &ChatId, reply: &CompletionMessage) {
        self.push(format!("send_success {}", reply.text));
    }

    fn on_send_fail(&self, kind: FailureKind, _message: &str) {
        self.push(format!("send_fail {}", kind.as_str()));
    }

    fn on_subscription_error(&self, _chat_id: &ChatId, _message: &str) {
        self.push("subscription_error".to_string());
    }

    fn on_close(&self, _chat_id: Option<&ChatId>) {
        self.push("close".to_string());
    }
}
