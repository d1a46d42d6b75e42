//! Completion domain.
//!
//! - [`entities::CompletionMessage`] - one role-tagged entry exchanged with the model
//! - [`request::build_completion_request`] - turns thread history into a request

pub mod entities;
pub mod request;
