//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to application types
//! after validation.

use avachat_application::ChatBehaviorConfig;
use avachat_domain::{Avatar, DEFAULT_BLOCKED_WORDS, DEFAULT_MIN_CHARS, TextPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Reply used by the offline backend, matching what the app shows in previews
pub const DEFAULT_CANNED_REPLY: &str = "This is returned text from the AI.";

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("timeout_seconds cannot be 0")]
    InvalidTimeout,

    #[error("model name cannot be empty")]
    EmptyModelName,

    #[error("min_message_chars cannot be 0")]
    InvalidMinChars,

    #[error("duplicate avatar id: {0}")]
    DuplicateAvatar(String),

    #[error("avatar id cannot be empty")]
    EmptyAvatarId,
}

/// Raw chat configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChatConfig {
    /// Minimum characters per message
    pub min_message_chars: usize,
    /// Messages that are rejected when they consist of exactly one of these words
    pub blocked_words: Vec<String>,
}

impl Default for FileChatConfig {
    fn default() -> Self {
        Self {
            min_message_chars: DEFAULT_MIN_CHARS,
            blocked_words: DEFAULT_BLOCKED_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// Which completion backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionProvider {
    /// OpenAI-compatible HTTP API
    #[default]
    Openai,
    /// Fixed reply, no network
    Canned,
}

/// Raw completion configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCompletionConfig {
    pub provider: CompletionProvider,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Timeout in seconds for one reply
    pub timeout_seconds: Option<u64>,
    /// Reply returned by the canned provider
    pub canned_reply: String,
}

impl Default for FileCompletionConfig {
    fn default() -> Self {
        Self {
            provider: CompletionProvider::default(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_seconds: Some(60),
            canned_reply: DEFAULT_CANNED_REPLY.to_string(),
        }
    }
}

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Path of the JSONL chat event log; disabled when unset
    pub event_log: Option<String>,
}

/// One `[[avatars]]` entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAvatarConfig {
    pub id: String,
    pub name: Option<String>,
    /// Persona used as the system prompt
    pub description: Option<String>,
}

impl FileAvatarConfig {
    pub fn to_avatar(&self) -> Avatar {
        Avatar {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Complete configuration file structure
///
/// ```toml
/// [chat]
/// min_message_chars = 3
/// blocked_words = ["shit", "bitch", "ass"]
///
/// [completion]
/// provider = "openai"
/// model = "gpt-4-turbo"
/// timeout_seconds = 60
///
/// [logging]
/// event_log = "~/.local/share/avachat/events.jsonl"
///
/// [[avatars]]
/// id = "whiskers"
/// name = "Whiskers"
/// description = "cat that loves naps"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub chat: FileChatConfig,
    pub completion: FileCompletionConfig,
    pub logging: FileLoggingConfig,
    pub avatars: Vec<FileAvatarConfig>,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let Some(0) = self.completion.timeout_seconds {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        if self.completion.model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName);
        }

        if self.chat.min_message_chars == 0 {
            return Err(ConfigValidationError::InvalidMinChars);
        }

        let mut seen = HashSet::new();
        for avatar in &self.avatars {
            if avatar.id.trim().is_empty() {
                return Err(ConfigValidationError::EmptyAvatarId);
            }
            if !seen.insert(avatar.id.as_str()) {
                return Err(ConfigValidationError::DuplicateAvatar(avatar.id.clone()));
            }
        }

        Ok(())
    }

    /// Convert to the application's chat behavior config
    pub fn to_behavior_config(&self) -> ChatBehaviorConfig {
        let policy = TextPolicy::new(
            self.chat.min_message_chars,
            self.chat.blocked_words.iter().cloned(),
        );
        ChatBehaviorConfig::from_timeout_seconds(self.completion.timeout_seconds)
            .with_text_policy(policy)
    }

    pub fn avatar_list(&self) -> Vec<Avatar> {
        self.avatars.iter().map(FileAvatarConfig::to_avatar).collect()
    }
}
