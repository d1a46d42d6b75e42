//! Chat domain.
//!
//! - [`entities::ChatThread`] - a conversation between one user and one avatar
//! - [`entities::ChatMessage`] - a single append-only message within a thread
//! - [`entities::ChatReport`] - a user's report against a thread
//! - [`snapshot::sort_snapshot`] - ordering applied to every live snapshot

pub mod entities;
pub mod snapshot;
pub mod value_objects;
