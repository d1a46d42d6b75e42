//! Prompt domain
//!
//! Templates for the system entry that introduces an avatar to the model.

mod template;

pub use template::PromptTemplate;
