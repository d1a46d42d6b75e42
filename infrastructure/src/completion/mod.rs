//! Completion backend adapters

mod canned;
mod openai;

pub use canned::CannedCompletionBackend;
pub use openai::OpenAiCompletionBackend;
