//! Offline completion backend

use async_trait::async_trait;
use avachat_application::{CompletionBackend, CompletionError};
use avachat_domain::CompletionMessage;

/// Answers every request with the same assistant text
pub struct CannedCompletionBackend {
    reply: String,
}

impl CannedCompletionBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl CompletionBackend for CannedCompletionBackend {
    async fn generate_reply(
        &self,
        messages: &[CompletionMessage],
    ) -> Result<CompletionMessage, CompletionError> {
        if messages.is_empty() {
            return Err(CompletionError::RequestFailed("empty conversation".to_string()));
        }
        Ok(CompletionMessage::assistant(self.reply.clone()))
    }
}
