//! Chat session state machine
//!
//! ```text
//! Idle → ThreadResolving → ThreadReady ⇄ GeneratingReply
//!   └──────────┴───────────────┴──────────────┴──→ Closed
//! ```
//!
//! `ThreadReady` does not imply a thread exists: a lookup that finds nothing
//! still ends resolution. The thread is created on the first send.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Lifecycle state of one open chat screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Constructed, not opened yet
    #[default]
    Idle,
    /// Looking up the (user, avatar) thread
    ThreadResolving,
    /// Thread resolved (found or confirmed absent); ready to send
    ThreadReady,
    /// Waiting for the completion backend
    GeneratingReply,
    /// Terminal
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::ThreadResolving => "thread_resolving",
            SessionState::ThreadReady => "thread_ready",
            SessionState::GeneratingReply => "generating_reply",
            SessionState::Closed => "closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    /// Whether a message can be sent from this state
    pub fn accepts_messages(&self) -> bool {
        matches!(self, SessionState::ThreadReady)
    }

    /// Check whether moving to `next` is allowed.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Idle, ThreadResolving) => true,
            (ThreadResolving, ThreadReady) => true,
            (ThreadReady, GeneratingReply) => true,
            (GeneratingReply, ThreadReady) => true,
            _ => false,
        }
    }

    /// Move to `next`, or fail with [`DomainError::InvalidTransition`].
    pub fn transition(self, next: SessionState) -> Result<SessionState, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
