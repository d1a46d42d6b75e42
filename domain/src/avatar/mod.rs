//! Avatar domain
//!
//! An avatar is an AI persona a user converses with. Only its description
//! matters to the chat core: it seeds the system prompt.

use serde::{Deserialize, Serialize};

/// An AI persona definition (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    #[serde(rename = "avatar_id")]
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "character_description")]
    pub description: Option<String>,
}

impl Avatar {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Name to show in a chat header, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_id() {
        assert_eq!(Avatar::new("a1").display_name(), "a1");
        assert_eq!(Avatar::new("a1").with_name("Alpha").display_name(), "Alpha");
    }
}
