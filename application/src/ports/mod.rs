//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod avatar_directory;
pub mod chat_observer;
pub mod chat_store;
pub mod completion_backend;
