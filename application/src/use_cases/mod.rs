//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod chat_inbox;
pub mod chat_session;

#[cfg(test)]
pub(crate) mod test_support;
