//! CLI entrypoint for avachat
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;

use anyhow::{Context, Result, anyhow};
use avachat_application::{
    ChatInboxUseCase, ChatObserver, ChatSessionUseCase, CompletionBackend, CompositeChatObserver,
};
use avachat_domain::{ChatMessage, MessageId, Role};
use avachat_infrastructure::{
    CannedCompletionBackend, CompletionProvider, ConfigLoader, ConfiguredAvatarDirectory,
    FileConfig, InMemoryChatStore, JsonlChatEventLog, OpenAiCompletionBackend,
};
use clap::Parser;
use commands::Cli;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FALLBACK_AVATAR: &str = "avatar";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    info!("Starting avachat");

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    config.validate().context("Invalid configuration")?;

    let avatar_id = cli
        .avatar
        .clone()
        .or_else(|| config.avatars.first().map(|a| a.id.clone()))
        .unwrap_or_else(|| FALLBACK_AVATAR.to_string());

    // === Dependency Injection ===
    let store = Arc::new(InMemoryChatStore::new());
    let backend = build_backend(&config, cli.offline)?;
    let avatars = Arc::new(ConfiguredAvatarDirectory::new(config.avatar_list()));

    let mut observers: Vec<Arc<dyn ChatObserver>> = Vec::new();
    if let Some(path) = &config.logging.event_log
        && let Some(log) = JsonlChatEventLog::new(path)
    {
        info!("Writing chat events to {}", log.path().display());
        observers.push(Arc::new(log));
    }

    let session = ChatSessionUseCase::new(store.clone(), backend, &cli.user, &avatar_id)
        .with_avatar_directory(avatars)
        .with_observer(Arc::new(CompositeChatObserver::new(observers)))
        .with_config(config.to_behavior_config());
    let inbox = ChatInboxUseCase::new(store);

    if let Err(e) = session.open(None).await {
        warn!("Chat opened without history: {}", e);
        eprintln!("Could not load this chat: {}", e);
    }

    let title = session
        .avatar()
        .map(|a| a.display_name().to_string())
        .unwrap_or_else(|| avatar_id.clone());
    println!();
    println!("Chatting with {} (/chats to list chats, /quit to leave)", title);
    println!();

    let printer = spawn_printer(&session, title);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/chats" => print_chats(&inbox, &cli.user).await,
            text => {
                if let Err(e) = session.send_message(text).await {
                    eprintln!("! {}", e);
                }
            }
        }
    }

    session.close();
    printer.abort();
    Ok(())
}

fn build_backend(config: &FileConfig, offline: bool) -> Result<Arc<dyn CompletionBackend>> {
    if offline || config.completion.provider == CompletionProvider::Canned {
        info!("Using canned replies");
        return Ok(Arc::new(CannedCompletionBackend::new(
            config.completion.canned_reply.clone(),
        )));
    }

    let backend = OpenAiCompletionBackend::from_config(&config.completion)
        .context("Could not set up the completion backend (use --offline to skip it)")?;
    info!("Using model {}", backend.model());
    Ok(Arc::new(backend))
}

/// Print messages as they arrive in the live snapshot, plus a typing marker
fn spawn_printer(session: &ChatSessionUseCase, title: String) -> JoinHandle<()> {
    let mut messages = session.watch_messages();
    let mut generating = session.watch_generating();
    let user_id = session.user_id().to_string();

    tokio::spawn(async move {
        let mut printed: HashSet<MessageId> = HashSet::new();
        loop {
            tokio::select! {
                changed = messages.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = messages.borrow_and_update().clone();
                    for message in snapshot {
                        if printed.insert(message.id.clone()) {
                            print_message(&message, &user_id, &title);
                        }
                    }
                }
                changed = generating.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if *generating.borrow_and_update() {
                        println!("  {} is typing...", title);
                    }
                }
            }
        }
    })
}

fn print_message(message: &ChatMessage, user_id: &str, title: &str) {
    let Some(content) = &message.content else {
        return;
    };
    let speaker = match content.role {
        Role::User if message.author_id.as_deref() == Some(user_id) => "you",
        Role::System => return,
        _ => title,
    };
    println!(
        "[{}] {}: {}",
        message.created_at.format("%H:%M"),
        speaker,
        content.text
    );
}

async fn print_chats(inbox: &ChatInboxUseCase, user_id: &str) {
    match inbox.list_chats(user_id).await {
        Ok(chats) if chats.is_empty() => println!("No chats yet."),
        Ok(chats) => {
            for chat in chats {
                let preview = chat
                    .last_message
                    .as_ref()
                    .and_then(|m| m.text())
                    .map(|t| avachat_domain::util::preview(t, 40))
                    .unwrap_or_default();
                println!(
                    "  {} ({})  {}",
                    chat.thread.avatar_id,
                    chat.thread.modified_at.format("%Y-%m-%d %H:%M"),
                    preview
                );
            }
        }
        Err(e) => eprintln!("! {}", e),
    }
}
