//! Configuration file loading for avachat
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment: `AVACHAT_*` (nested keys joined with `__`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./avachat.toml` or `./.avachat.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/avachat/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAvatarConfig, FileChatConfig, FileCompletionConfig,
    FileConfig, FileLoggingConfig, CompletionProvider, DEFAULT_CANNED_REPLY,
};
pub use loader::ConfigLoader;
