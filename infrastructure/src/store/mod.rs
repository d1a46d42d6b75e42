//! Chat store adapters

mod memory;

pub use memory::InMemoryChatStore;
