//! Chat Session use case
//!
//! Drives one open chat screen: resolves the (user, avatar) thread, follows
//! its messages live, and runs the send flow
//!
//! 1. validate the text (nothing is written when this fails)
//! 2. create the thread on first send and attach the live subscription to it
//! 3. append the user's message
//! 4. ask the completion backend for a reply, using the live history
//! 5. append the reply as the avatar's message
//!
//! A failure after step 3 leaves the user's message in place. Nothing is
//! retried.
//!
//! The displayed message list comes only from the live subscription. Sending
//! never inserts its own message into that list; it waits for the store to
//! echo it back.

use crate::config::ChatBehaviorConfig;
use crate::ports::avatar_directory::AvatarDirectory;
use crate::ports::chat_observer::{ChatObserver, FailureKind, NoChatObserver};
use crate::ports::chat_store::{ChatStore, MessageSubscription, StoreError};
use crate::ports::completion_backend::{CompletionBackend, CompletionError};
use avachat_domain::util::preview;
use avachat_domain::{
    Avatar, ChatId, ChatMessage, ChatThread, CompletionMessage, SessionState,
    TextValidationError, build_completion_request, sort_snapshot,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

/// Errors surfaced by the chat session.
///
/// The `Display` output is meant to be shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatSessionError {
    #[error("{0}")]
    Validation(#[from] TextValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Chat is not ready to send (state: {0})")]
    NotReady(SessionState),

    #[error("Chat session already opened")]
    AlreadyOpened,

    #[error("Chat session closed")]
    Closed,
}

impl ChatSessionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ChatSessionError::Validation(_) => FailureKind::Validation,
            ChatSessionError::Store(_) => FailureKind::Store,
            ChatSessionError::Completion(_) => FailureKind::Completion,
            ChatSessionError::NotReady(_)
            | ChatSessionError::AlreadyOpened
            | ChatSessionError::Closed => FailureKind::Session,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ChatSessionError::Validation(_))
    }
}

/// A running live-subscription task and the token that stops it
struct Listener {
    token: CancellationToken,
    chat_id: ChatId,
    _task: JoinHandle<()>,
}

/// State shared between the session handle(s) and its listener task.
///
/// Every output is a `watch` channel so the UI can subscribe at any time and
/// always sees the latest value.
struct LiveState {
    thread: watch::Sender<Option<ChatThread>>,
    messages: watch::Sender<Vec<ChatMessage>>,
    generating: watch::Sender<bool>,
    state: watch::Sender<SessionState>,
    last_error: watch::Sender<Option<ChatSessionError>>,
    avatar: watch::Sender<Option<Avatar>>,
    /// Held while publishing snapshots and while cancelling listeners, so a
    /// cancelled listener never publishes after cancellation returns.
    listener: Mutex<Option<Listener>>,
    shutdown: CancellationToken,
}

impl LiveState {
    fn new() -> Self {
        Self {
            thread: watch::Sender::new(None),
            messages: watch::Sender::new(Vec::new()),
            generating: watch::Sender::new(false),
            state: watch::Sender::new(SessionState::Idle),
            last_error: watch::Sender::new(None),
            avatar: watch::Sender::new(None),
            listener: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<Listener>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_state(&self) -> SessionState {
        *self.state.borrow()
    }

    fn is_closed(&self) -> bool {
        self.current_state().is_closed()
    }

    /// Apply a state change if the state machine allows it.
    fn advance(&self, next: SessionState) -> bool {
        self.state.send_if_modified(|state| match state.transition(next) {
            Ok(next) => {
                *state = next;
                true
            }
            Err(_) => false,
        })
    }

    fn set_generating(&self, generating: bool) {
        if generating && self.is_closed() {
            return;
        }
        self.generating.send_if_modified(|current| {
            let changed = *current != generating;
            *current = generating;
            changed
        });
    }
}

/// Use case owning the lifecycle of one open chat screen.
///
/// Cheap to clone; clones share the same session. When the last clone is
/// dropped the live subscription is cancelled.
///
/// ```text
/// open() ──► find_thread ──► subscribe_messages ──► listener task ──► messages()
///                                   ▲
/// send_message() ── create_thread ──┘ (first send only)
///                └─ append user msg ──► generate_reply ──► append reply
/// ```
#[derive(Clone)]
pub struct ChatSessionUseCase {
    store: Arc<dyn ChatStore>,
    backend: Arc<dyn CompletionBackend>,
    avatars: Option<Arc<dyn AvatarDirectory>>,
    observer: Arc<dyn ChatObserver>,
    config: ChatBehaviorConfig,
    user_id: String,
    avatar_id: String,
    live: Arc<LiveState>,
    /// Serializes sends so two appends never interleave
    send_lock: Arc<tokio::sync::Mutex<()>>,
    _cancel_on_drop: Arc<DropGuard>,
}

impl ChatSessionUseCase {
    pub fn new(
        store: Arc<dyn ChatStore>,
        backend: Arc<dyn CompletionBackend>,
        user_id: impl Into<String>,
        avatar_id: impl Into<String>,
    ) -> Self {
        let live = Arc::new(LiveState::new());
        let cancel_on_drop = live.shutdown.clone().drop_guard();
        Self {
            store,
            backend,
            avatars: None,
            observer: Arc::new(NoChatObserver),
            config: ChatBehaviorConfig::default(),
            user_id: user_id.into(),
            avatar_id: avatar_id.into(),
            live,
            send_lock: Arc::new(tokio::sync::Mutex::new(())),
            _cancel_on_drop: Arc::new(cancel_on_drop),
        }
    }

    /// Resolve the avatar on open, to prefix requests with its persona.
    pub fn with_avatar_directory(mut self, avatars: Arc<dyn AvatarDirectory>) -> Self {
        self.avatars = Some(avatars);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ChatObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_config(mut self, config: ChatBehaviorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn avatar_id(&self) -> &str {
        &self.avatar_id
    }

    // ==================== Outputs ====================

    pub fn state(&self) -> SessionState {
        self.live.current_state()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.live.state.subscribe()
    }

    /// The resolved thread, `None` until one is found or created
    pub fn thread(&self) -> Option<ChatThread> {
        self.live.thread.borrow().clone()
    }

    pub fn watch_thread(&self) -> watch::Receiver<Option<ChatThread>> {
        self.live.thread.subscribe()
    }

    /// Latest snapshot, sorted by creation time
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.live.messages.borrow().clone()
    }

    pub fn watch_messages(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.live.messages.subscribe()
    }

    pub fn is_generating(&self) -> bool {
        *self.live.generating.borrow()
    }

    pub fn watch_generating(&self) -> watch::Receiver<bool> {
        self.live.generating.subscribe()
    }

    /// Last error of a [`submit_message`](Self::submit_message) call
    pub fn last_error(&self) -> Option<ChatSessionError> {
        self.live.last_error.borrow().clone()
    }

    pub fn watch_errors(&self) -> watch::Receiver<Option<ChatSessionError>> {
        self.live.last_error.subscribe()
    }

    pub fn avatar(&self) -> Option<Avatar> {
        self.live.avatar.borrow().clone()
    }

    // ==================== Operations ====================

    /// Resolve the thread and start following its messages.
    ///
    /// With `existing` absent the thread is looked up by (user, avatar); no
    /// thread is created here. Finding nothing is not an error. A failed
    /// lookup is returned, but the session still becomes ready so the user
    /// can send.
    pub async fn open(&self, existing: Option<ChatThread>) -> Result<(), ChatSessionError> {
        self.begin_open()?;
        info!(
            "Opening chat for user {} with avatar {}",
            self.user_id, self.avatar_id
        );

        let (lookup, avatar) = tokio::join!(self.resolve_thread(existing), self.resolve_avatar());
        if avatar.is_some() {
            self.live.avatar.send_replace(avatar);
        }

        let result = match lookup {
            Ok(thread) => {
                self.live.thread.send_replace(thread.clone());
                match &thread {
                    Some(thread) => {
                        debug!("Resolved thread {}", thread.id);
                        self.attach_listener(thread.id.clone())
                            .await
                            .map_err(|e| {
                                warn!("Failed to attach chat message listener: {}", e);
                                ChatSessionError::from(e)
                            })
                    }
                    None => {
                        debug!("No thread yet; listener deferred until first send");
                        Ok(())
                    }
                }
            }
            Err(e) => {
                warn!("Thread lookup failed: {}", e);
                Err(ChatSessionError::from(e))
            }
        };

        self.live.advance(SessionState::ThreadReady);
        if !self.live.is_closed() {
            self.observer
                .on_open(&self.user_id, &self.avatar_id, self.thread().as_ref());
        }
        result
    }

    /// Send `text` and store the avatar's reply.
    ///
    /// Calls are serialized per session. "Is generating" is set from the
    /// moment the request is built until the reply is stored or the attempt
    /// fails.
    pub async fn send_message(&self, text: &str) -> Result<(), ChatSessionError> {
        let _guard = self.send_lock.lock().await;

        let state = self.live.current_state();
        if state.is_closed() {
            return Err(ChatSessionError::Closed);
        }
        if !state.accepts_messages() {
            return Err(ChatSessionError::NotReady(state));
        }

        let chat_id = self.thread().map(|t| t.id);
        self.observer.on_send_start(chat_id.as_ref(), text);
        debug!("Sending message: {}", preview(text, 60));

        match self.exchange(text).await {
            Ok((chat_id, reply)) => {
                info!("Reply stored in {}", chat_id);
                self.observer.on_send_success(&chat_id, &reply);
                Ok(())
            }
            Err(e) => {
                warn!("Send failed: {}", e);
                self.observer.on_send_fail(e.kind(), &e.to_string());
                Err(e)
            }
        }
    }

    /// Fire-and-forget [`send_message`](Self::send_message).
    ///
    /// The outcome is published to [`last_error`](Self::last_error): set on
    /// failure, cleared on success. If the session was closed meanwhile the
    /// outcome is dropped.
    pub fn submit_message(&self, text: impl Into<String>) -> JoinHandle<()> {
        let session = self.clone();
        let text = text.into();
        tokio::spawn(async move {
            let result = session.send_message(&text).await;
            if session.live.is_closed() {
                debug!("Session closed; discarding send result");
                return;
            }
            session.live.last_error.send_replace(result.err());
        })
    }

    /// Stop following messages. Safe to call any number of times.
    ///
    /// No snapshot is published after this returns. A send that is already
    /// running completes in the background.
    pub fn close(&self) {
        let closed_now = self.live.state.send_if_modified(|state| {
            if state.is_closed() {
                false
            } else {
                *state = SessionState::Closed;
                true
            }
        });
        if !closed_now {
            return;
        }

        {
            let mut listener = self.live.lock_listener();
            self.live.shutdown.cancel();
            if let Some(listener) = listener.take() {
                listener.token.cancel();
            }
        }
        self.live.set_generating(false);

        info!("Closed chat for avatar {}", self.avatar_id);
        self.observer.on_close(self.thread().as_ref().map(|t| &t.id));
    }

    // ==================== Internals ====================

    fn begin_open(&self) -> Result<(), ChatSessionError> {
        let mut outcome = Ok(());
        self.live.state.send_if_modified(|state| {
            match state.transition(SessionState::ThreadResolving) {
                Ok(next) => {
                    *state = next;
                    true
                }
                Err(_) => {
                    outcome = Err(if state.is_closed() {
                        ChatSessionError::Closed
                    } else {
                        ChatSessionError::AlreadyOpened
                    });
                    false
                }
            }
        });
        outcome
    }

    async fn resolve_thread(
        &self,
        existing: Option<ChatThread>,
    ) -> Result<Option<ChatThread>, StoreError> {
        if let Some(thread) = existing {
            return Ok(Some(thread));
        }
        self.store.find_thread(&self.user_id, &self.avatar_id).await
    }

    async fn resolve_avatar(&self) -> Option<Avatar> {
        let avatars = self.avatars.as_ref()?;
        match avatars.get_avatar(&self.avatar_id).await {
            Ok(avatar) => Some(avatar),
            Err(e) => {
                warn!("Error loading avatar {}: {}", self.avatar_id, e);
                None
            }
        }
    }

    /// Steps 1-5 of the send flow.
    async fn exchange(&self, text: &str) -> Result<(ChatId, CompletionMessage), ChatSessionError> {
        self.config.text_policy.check(text)?;

        let thread = self.ensure_thread().await?;

        let message = ChatMessage::user(thread.id.clone(), &self.user_id, text);
        self.store.append_message(&thread.id, &message).await?;
        debug!("Stored user message {}", message.id);

        self.live.advance(SessionState::GeneratingReply);
        self.live.set_generating(true);

        let result = self.generate_and_store(&thread, &message).await;

        self.live.set_generating(false);
        self.live.advance(SessionState::ThreadReady);

        result.map(|reply| (thread.id, reply))
    }

    /// Return the current thread, creating it (and following it) on first use.
    ///
    /// A thread that already exists for the pair (e.g. one a failed lookup
    /// missed) is adopted instead of created.
    async fn ensure_thread(&self) -> Result<ChatThread, ChatSessionError> {
        let current = self.thread();
        if let Some(thread) = current {
            return Ok(thread);
        }

        let candidate = ChatThread::new(&self.user_id, &self.avatar_id);
        let thread = match self.store.create_thread(&candidate).await {
            Ok(()) => {
                info!("Created thread {}", candidate.id);
                candidate
            }
            Err(StoreError::Conflict(reason)) => {
                debug!("Thread {} already exists: {}", candidate.id, reason);
                self.adopt_existing(candidate).await
            }
            Err(e) => return Err(e.into()),
        };

        self.live.thread.send_replace(Some(thread.clone()));
        self.attach_listener(thread.id.clone()).await?;
        Ok(thread)
    }

    /// Look up the stored thread after a create conflict. The id is derived
    /// from the pair, so `candidate` is used when the lookup fails again.
    async fn adopt_existing(&self, candidate: ChatThread) -> ChatThread {
        match self.store.find_thread(&self.user_id, &self.avatar_id).await {
            Ok(Some(thread)) => {
                info!("Adopted existing thread {}", thread.id);
                thread
            }
            Ok(None) => candidate,
            Err(e) => {
                warn!("Lookup after conflict failed, using {}: {}", candidate.id, e);
                candidate
            }
        }
    }

    async fn generate_and_store(
        &self,
        thread: &ChatThread,
        pending: &ChatMessage,
    ) -> Result<CompletionMessage, ChatSessionError> {
        let history = self.messages();
        let description = self.avatar().and_then(|a| a.description);
        let request = build_completion_request(&history, Some(pending), description.as_deref());
        debug!("Requesting reply with {} entries", request.len());

        let reply = self.request_reply(&request).await?;
        if reply.text.trim().is_empty() {
            return Err(CompletionError::InvalidResponse("empty reply".to_string()).into());
        }
        let reply = CompletionMessage::assistant(reply.text);

        let reply_message = ChatMessage::assistant(thread.id.clone(), &self.avatar_id, reply.clone());
        self.store.append_message(&thread.id, &reply_message).await?;
        Ok(reply)
    }

    async fn request_reply(
        &self,
        request: &[CompletionMessage],
    ) -> Result<CompletionMessage, CompletionError> {
        match self.config.completion_timeout {
            Some(limit) => tokio::time::timeout(limit, self.backend.generate_reply(request))
                .await
                .map_err(|_| CompletionError::Timeout)?,
            None => self.backend.generate_reply(request).await,
        }
    }

    /// Follow `chat_id`, replacing any previous listener.
    ///
    /// Returns once the store has accepted the subscription, so the first
    /// snapshot of the new thread is on its way before the caller continues.
    async fn attach_listener(&self, chat_id: ChatId) -> Result<(), StoreError> {
        let subscription = self.store.subscribe_messages(&chat_id).await?;

        let mut slot = self.live.lock_listener();
        if self.live.shutdown.is_cancelled() {
            debug!("Session closed while subscribing to {}", chat_id);
            return Ok(());
        }
        if let Some(previous) = slot.take() {
            debug!("Detaching listener from {}", previous.chat_id);
            previous.token.cancel();
        }

        let token = self.live.shutdown.child_token();
        let task = tokio::spawn(run_listener(
            Arc::clone(&self.live),
            Arc::clone(&self.observer),
            token.clone(),
            chat_id.clone(),
            subscription,
        ));
        *slot = Some(Listener {
            token,
            chat_id,
            _task: task,
        });
        Ok(())
    }
}

/// Publish sorted snapshots until cancelled, the stream fails, or it ends.
async fn run_listener(
    live: Arc<LiveState>,
    observer: Arc<dyn ChatObserver>,
    token: CancellationToken,
    chat_id: ChatId,
    mut subscription: MessageSubscription,
) {
    debug!("Listening for messages in {}", chat_id);
    loop {
        let next = tokio::select! {
            _ = token.cancelled() => break,
            next = subscription.recv() => next,
        };

        match next {
            Some(Ok(mut snapshot)) => {
                sort_snapshot(&mut snapshot);
                let _slot = live.lock_listener();
                if token.is_cancelled() {
                    break;
                }
                live.messages.send_replace(snapshot);
            }
            Some(Err(e)) => {
                if !token.is_cancelled() {
                    warn!("Message subscription for {} failed: {}", chat_id, e);
                    observer.on_subscription_error(&chat_id, &e.to_string());
                }
                break;
            }
            None => {
                debug!("Message subscription for {} ended", chat_id);
                break;
            }
        }
    }
}
