//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: domain-level errors (invalid patterns, illegal transitions)
//! - [`string::truncate`]: UTF-8 safe truncation used for bounded output capture

pub mod error;
pub mod string;
