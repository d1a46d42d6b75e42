//! Avatar directory backed by configuration

use async_trait::async_trait;
use avachat_application::{AvatarDirectory, AvatarError};
use avachat_domain::Avatar;
use std::collections::HashMap;

/// [`AvatarDirectory`] over the `[[avatars]]` entries of the config file
pub struct ConfiguredAvatarDirectory {
    avatars: HashMap<String, Avatar>,
}

impl ConfiguredAvatarDirectory {
    pub fn new(avatars: impl IntoIterator<Item = Avatar>) -> Self {
        Self {
            avatars: avatars.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }
}

#[async_trait]
impl AvatarDirectory for ConfiguredAvatarDirectory {
    async fn get_avatar(&self, avatar_id: &str) -> Result<Avatar, AvatarError> {
        self.avatars
            .get(avatar_id)
            .cloned()
            .ok_or_else(|| AvatarError::NotFound(avatar_id.to_string()))
    }
}
