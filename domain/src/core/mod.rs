//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`] - domain-level errors
//! - [`text_policy::TextPolicy`] - validation rules for user-authored chat text

pub mod error;
pub mod text_policy;
