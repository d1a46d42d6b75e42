//! Avatar Directory port
//!
//! Resolves avatar ids to their persona definition.

use async_trait::async_trait;
use avachat_domain::Avatar;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvatarError {
    #[error("Avatar not found: {0}")]
    NotFound(String),

    #[error("Avatar lookup failed: {0}")]
    LookupFailed(String),
}

#[async_trait]
pub trait AvatarDirectory: Send + Sync {
    async fn get_avatar(&self, avatar_id: &str) -> Result<Avatar, AvatarError>;
}
