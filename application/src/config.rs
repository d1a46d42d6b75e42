//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave,
//! such as the outgoing text policy and the completion timeout.

use avachat_domain::TextPolicy;
use std::time::Duration;

/// Chat behavior configuration.
///
/// Controls runtime behavior of the chat session: which texts may be sent and
/// how long to wait for the completion backend.
#[derive(Debug, Clone, Default)]
pub struct ChatBehaviorConfig {
    /// Validation rules applied before anything is written.
    pub text_policy: TextPolicy,
    /// Maximum time to wait for a generated reply before timing out.
    pub completion_timeout: Option<Duration>,
}

impl ChatBehaviorConfig {
    /// Creates a ChatBehaviorConfig with a completion timeout specified in seconds.
    pub fn with_timeout_seconds(seconds: u64) -> Self {
        Self {
            completion_timeout: Some(Duration::from_secs(seconds)),
            ..Self::default()
        }
    }

    /// Creates a ChatBehaviorConfig from an optional timeout in seconds.
    ///
    /// If `seconds` is `None`, no timeout is applied.
    pub fn from_timeout_seconds(seconds: Option<u64>) -> Self {
        Self {
            completion_timeout: seconds.map(Duration::from_secs),
            ..Self::default()
        }
    }

    pub fn with_text_policy(mut self, policy: TextPolicy) -> Self {
        self.text_policy = policy;
        self
    }
}
