//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for avachat
#[derive(Parser, Debug)]
#[command(name = "avachat")]
#[command(author, version, about = "Chat with AI avatars from your terminal")]
#[command(long_about = r#"
avachat opens a chat with one avatar. Every message you send is stored in the
chat thread and answered by the avatar, in the persona from its description.

Type a message and press enter. Commands:
  /chats   list your chats, most recent first
  /quit    leave the chat

Configuration files are loaded from (in priority order):
1. AVACHAT_* environment variables (e.g. AVACHAT_COMPLETION__MODEL)
2. --config <path>     Explicit config file
3. ./avachat.toml      Project-level config
4. ~/.config/avachat/config.toml   Global config

Example:
  avachat --avatar whiskers
  avachat --offline --user alice --avatar rex
"#)]
pub struct Cli {
    /// User id to chat as
    #[arg(short, long, value_name = "ID", default_value = "local-user")]
    pub user: String,

    /// Avatar to chat with (defaults to the first configured avatar)
    #[arg(short, long, value_name = "ID")]
    pub avatar: Option<String>,

    /// Use the canned backend instead of calling the completion API
    #[arg(long)]
    pub offline: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
