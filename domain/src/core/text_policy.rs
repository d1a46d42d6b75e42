//! Text policy for user-authored chat messages
//!
//! A message is accepted when it has at least `min_chars` characters and is
//! not, as a whole, one of the blocked words. Blocked words are matched
//! case-insensitively against the entire text, not as substrings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of characters a chat message must contain.
pub const DEFAULT_MIN_CHARS: usize = 3;

/// Words rejected by the default policy.
pub const DEFAULT_BLOCKED_WORDS: &[&str] = &["shit", "bitch", "ass"];

/// Reasons a chat message can be rejected before anything is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextValidationError {
    #[error("Please add at least {min} characters.")]
    TooShort { min: usize },

    #[error("Bad word detected. Please rephrase your message.")]
    Blocked,
}

/// Validation rules for outgoing chat text (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPolicy {
    min_chars: usize,
    blocked_words: Vec<String>,
}

impl Default for TextPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MIN_CHARS,
            DEFAULT_BLOCKED_WORDS.iter().map(|w| w.to_string()),
        )
    }
}

impl TextPolicy {
    /// Create a policy. Blocked words are stored lowercased.
    ///
    /// A minimum of zero still rejects empty text.
    pub fn new(min_chars: usize, blocked_words: impl IntoIterator<Item = String>) -> Self {
        Self {
            min_chars: min_chars.max(1),
            blocked_words: blocked_words
                .into_iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    pub fn blocked_words(&self) -> &[String] {
        &self.blocked_words
    }

    /// Check `text` against the policy.
    pub fn check(&self, text: &str) -> Result<(), TextValidationError> {
        if text.chars().count() < self.min_chars {
            return Err(TextValidationError::TooShort {
                min: self.min_chars,
            });
        }

        let lowered = text.to_lowercase();
        if self.blocked_words.iter().any(|w| *w == lowered) {
            return Err(TextValidationError::Blocked);
        }

        Ok(())
    }
}
