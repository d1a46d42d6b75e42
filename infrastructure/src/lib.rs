//! Infrastructure layer for avachat
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod avatars;
pub mod completion;
pub mod config;
pub mod logging;
pub mod store;

// Re-export commonly used types
pub use avatars::ConfiguredAvatarDirectory;
pub use completion::{CannedCompletionBackend, OpenAiCompletionBackend};
pub use config::{
    CompletionProvider, ConfigLoader, ConfigValidationError, FileAvatarConfig, FileChatConfig,
    FileCompletionConfig, FileConfig, FileLoggingConfig,
};
pub use logging::JsonlChatEventLog;
pub use store::InMemoryChatStore;
