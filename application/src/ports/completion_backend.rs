//! Completion Backend port
//!
//! Defines the interface for asking the hosted model for one reply.

use async_trait::async_trait;
use avachat_domain::CompletionMessage;
use thiserror::Error;

/// Errors that can occur while generating a reply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The backend answered, but with nothing usable
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,
}

impl CompletionError {
    /// Check if the backend answered with an empty or malformed reply
    pub fn is_invalid_response(&self) -> bool {
        matches!(self, CompletionError::InvalidResponse(_))
    }
}

/// Backend for reply generation
///
/// Receives the ordered conversation (optionally led by one system entry) and
/// returns exactly one generated entry. Implementations live in the
/// infrastructure layer.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn generate_reply(
        &self,
        messages: &[CompletionMessage],
    ) -> Result<CompletionMessage, CompletionError>;
}
