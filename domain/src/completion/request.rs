//! Building completion requests from thread history

use super::entities::CompletionMessage;
use crate::chat::entities::ChatMessage;
use crate::prompt::PromptTemplate;

/// Build the ordered request sent to the completion backend.
///
/// - every message of `history` that has content, in history order
/// - `pending` appended at the end when `history` does not contain it yet
///   (the live snapshot may lag behind a message that was just stored)
/// - one system entry in front when an avatar description is known
pub fn build_completion_request(
    history: &[ChatMessage],
    pending: Option<&ChatMessage>,
    avatar_description: Option<&str>,
) -> Vec<CompletionMessage> {
    let mut request: Vec<CompletionMessage> = history
        .iter()
        .filter_map(|m| m.content.clone())
        .collect();

    if let Some(pending) = pending
        && !history.iter().any(|m| m.id == pending.id)
        && let Some(content) = &pending.content
    {
        request.push(content.clone());
    }

    if let Some(description) = avatar_description
        && !description.trim().is_empty()
    {
        request.insert(
            0,
            CompletionMessage::system(PromptTemplate::avatar_system(description)),
        );
    }

    request
}
