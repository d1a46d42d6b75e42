//! Live snapshot ordering
//!
//! The store delivers message lists in no particular order. Every snapshot is
//! put into creation order before anything reads it.

use super::entities::ChatMessage;

/// Sort a snapshot by `created_at` ascending.
///
/// The sort is stable, so messages sharing a timestamp keep their delivery order.
pub fn sort_snapshot(messages: &mut [ChatMessage]) {
    messages.sort_by_key(|m| m.created_at);
}
