//! Application layer for avachat
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::ChatBehaviorConfig;
pub use ports::{
    avatar_directory::{AvatarDirectory, AvatarError},
    chat_observer::{ChatObserver, CompositeChatObserver, FailureKind, NoChatObserver},
    chat_store::{ChatStore, MessageSubscription, SnapshotResult, StoreError},
    completion_backend::{CompletionBackend, CompletionError},
};
pub use use_cases::chat_inbox::{ChatInboxError, ChatInboxUseCase, ChatSummary};
pub use use_cases::chat_session::{ChatSessionError, ChatSessionUseCase};
