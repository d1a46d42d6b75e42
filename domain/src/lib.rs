//! Domain layer for avachat
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Threads and Messages
//!
//! - **Chat thread**: a persistent conversation between one user and one avatar,
//!   created lazily on the first sent message
//! - **Chat message**: an append-only entry in a thread, carrying role-tagged content
//!
//! ## Completion
//!
//! The hosted model receives an ordered list of role-tagged entries
//! ([`CompletionMessage`]) and answers with exactly one.
//!
//! ## Session
//!
//! One open chat screen moves through [`SessionState`]:
//! `Idle → ThreadResolving → ThreadReady ⇄ GeneratingReply`, ending in `Closed`.

pub mod avatar;
pub mod chat;
pub mod completion;
pub mod core;
pub mod prompt;
pub mod session;
pub mod util;

// Re-export commonly used types
pub use avatar::Avatar;
pub use chat::{
    entities::{ChatMessage, ChatReport, ChatThread},
    snapshot::sort_snapshot,
    value_objects::{ChatId, MessageId},
};
pub use completion::{
    entities::{CompletionMessage, Role},
    request::build_completion_request,
};
pub use core::{
    error::DomainError,
    text_policy::{DEFAULT_BLOCKED_WORDS, DEFAULT_MIN_CHARS, TextPolicy, TextValidationError},
};
pub use prompt::PromptTemplate;
pub use session::state::SessionState;
