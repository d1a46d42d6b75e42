//! Logging infrastructure for structured chat event logs.
//!
//! Provides [`JsonlChatEventLog`], a JSONL file writer that implements
//! the [`ChatObserver`](avachat_application::ChatObserver) port.

mod jsonl_event_log;

pub use jsonl_event_log::JsonlChatEventLog;
