//! Chat observer port
//!
//! Defines the [`ChatObserver`] trait, called by the chat session at fixed
//! points of its lifecycle (open, send start, send success, send failure).
//!
//! Observers are never required for correctness: every method has a no-op
//! default, calls are synchronous and infallible, and the session behaves the
//! same whether zero or many observers are attached.

use avachat_domain::{ChatId, ChatThread, CompletionMessage};
use std::sync::Arc;

/// Broad category of a failed send, for observers that only need to bucket errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Input rejected locally; nothing was sent
    Validation,
    /// Persistence or lookup failed
    Store,
    /// Reply generation failed
    Completion,
    /// The session was not in a state that accepts messages
    Session,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Store => "store",
            FailureKind::Completion => "completion",
            FailureKind::Session => "session",
        }
    }
}

/// Callback for chat session lifecycle events
///
/// Implementations live in the infrastructure layer (event logs, analytics)
/// or in tests.
pub trait ChatObserver: Send + Sync {
    /// Called once thread resolution finished (`thread` is `None` when none exists yet)
    fn on_open(&self, _user_id: &str, _avatar_id: &str, _thread: Option<&ChatThread>) {}

    /// Called when a send begins, before validation
    fn on_send_start(&self, _chat_id: Option<&ChatId>, _text: &str) {}

    /// Called after the reply was stored
    fn on_send_success(&self, _chat_id: &ChatId, _reply: &CompletionMessage) {}

    /// Called when a send failed at any step
    fn on_send_fail(&self, _kind: FailureKind, _message: &str) {}

    /// Called when the live message subscription ended with an error
    fn on_subscription_error(&self, _chat_id: &ChatId, _message: &str) {}

    /// Called once when the session is closed
    fn on_close(&self, _chat_id: Option<&ChatId>) {}
}

/// No-op observer for tests and when no observer is configured
pub struct NoChatObserver;

impl ChatObserver for NoChatObserver {}

/// An observer that forwards every event to multiple inner observers.
pub struct CompositeChatObserver {
    delegates: Vec<Arc<dyn ChatObserver>>,
}

impl CompositeChatObserver {
    pub fn new(delegates: Vec<Arc<dyn ChatObserver>>) -> Self {
        Self { delegates }
    }
}

/// Macro to delegate a method call to all inner observers.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        for d in &$self.delegates {
            d.$method($($arg),*);
        }
    };
}

impl ChatObserver for CompositeChatObserver {
    fn on_open(&self, user_id: &str, avatar_id: &str, thread: Option<&ChatThread>) {
        delegate!(self, on_open, user_id, avatar_id, thread);
    }

    fn on_send_start(&self, chat_id: Option<&ChatId>, text: &str) {
        delegate!(self, on_send_start, chat_id, text);
    }

    fn on_send_success(&self, chat_id: &ChatId, reply: &CompletionMessage) {
        delegate!(self, on_send_success, chat_id, reply);
    }

    fn on_send_fail(&self, kind: FailureKind, message: &str) {
        delegate!(self, on_send_fail, kind, message);
    }

    fn on_subscription_error(&self, chat_id: &ChatId, message: &str) {
        delegate!(self, on_subscription_error, chat_id, message);
    }

    fn on_close(&self, chat_id: Option<&ChatId>) {
        delegate!(self, on_close, chat_id);
    }
}
