//! JSONL file writer for chat session events.
//!
//! Each observer callback becomes a single JSON line with a `type` field and
//! `timestamp`, appended to the file via a buffered writer.

use avachat_application::{ChatObserver, FailureKind};
use avachat_domain::{ChatId, ChatThread, CompletionMessage};
use serde_json::{Value, json};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Chat event log that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Appends to an existing file and
/// flushes after every record.
pub struct JsonlChatEventLog {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlChatEventLog {
    /// Open (or create) the log at `path`, creating parent directories.
    ///
    /// Returns `None` if the file cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create chat event log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open chat event log {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, event_type: &str, payload: Value) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let mut record = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        record.insert("type".to_string(), Value::String(event_type.to_string()));
        record.insert("timestamp".to_string(), Value::String(timestamp));

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

impl ChatObserver for JsonlChatEventLog {
    fn on_open(&self, user_id: &str, avatar_id: &str, thread: Option<&ChatThread>) {
        self.write(
            "chat_open",
            json!({
                "user_id": user_id,
                "avatar_id": avatar_id,
                "chat_id": thread.map(|t| t.id.as_str()),
            }),
        );
    }

    fn on_send_start(&self, chat_id: Option<&ChatId>, text: &str) {
        self.write(
            "send_start",
            json!({
                "chat_id": chat_id.map(ChatId::as_str),
                "chars": text.chars().count(),
            }),
        );
    }

    fn on_send_success(&self, chat_id: &ChatId, reply: &CompletionMessage) {
        self.write(
            "send_success",
            json!({
                "chat_id": chat_id.as_str(),
                "role": reply.role.as_str(),
                "reply_chars": reply.text.chars().count(),
            }),
        );
    }

    fn on_send_fail(&self, kind: FailureKind, message: &str) {
        self.write(
            "send_fail",
            json!({
                "kind": kind.as_str(),
                "message": message,
            }),
        );
    }

    fn on_subscription_error(&self, chat_id: &ChatId, message: &str) {
        self.write(
            "subscription_error",
            json!({
                "chat_id": chat_id.as_str(),
                "message": message,
            }),
        );
    }

    fn on_close(&self, chat_id: Option<&ChatId>) {
        self.write("chat_close", json!({ "chat_id": chat_id.map(ChatId::as_str) }));
    }
}

impl Drop for JsonlChatEventLog {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_record_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let log = JsonlChatEventLog::new(&path).unwrap();
        let thread = ChatThread::new("u1", "a1");

        log.on_open("u1", "a1", Some(&thread));
        log.on_send_start(Some(&thread.id), "Hello there");
        log.on_send_success(&thread.id, &CompletionMessage::assistant("Hi!"));
        log.on_send_fail(FailureKind::Completion, "Timeout");
        log.on_close(Some(&thread.id));

        let records = read_lines(&path);
        assert_eq!(records.len(), 5);
        assert_eq!(records[0]["type"], "chat_open");
        assert_eq!(records[0]["chat_id"], "u1_a1");
        assert_eq!(records[1]["chars"], 11);
        assert_eq!(records[2]["role"], "assistant");
        assert_eq!(records[3]["kind"], "completion");
        assert_eq!(records[4]["type"], "chat_close");
        assert!(records.iter().all(|r| r["timestamp"].is_string()));
    }

    #[test]
    fn test_message_text_is_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let log = JsonlChatEventLog::new(&path).unwrap();

        log.on_send_start(None, "my secret plans");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("secret"));
        assert_eq!(read_lines(&path)[0]["chat_id"], Value::Null);
    }

    #[test]
    fn test_appends_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("events.jsonl");

        JsonlChatEventLog::new(&path).unwrap().on_close(None);
        JsonlChatEventLog::new(&path).unwrap().on_close(None);

        assert_eq!(read_lines(&path).len(), 2);
    }
}
