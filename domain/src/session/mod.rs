//! Chat session domain.
//!
//! - [`state::SessionState`] - lifecycle of one open chat screen

pub mod state;
