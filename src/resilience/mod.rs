//! Resilience helpers.
//!
//! # Design Decisions
//! - The core never retries a failed selection itself; callers decide
//! - Callers that do wait and retry use jittered exponential backoff

pub mod backoff;

pub use backoff::Backoff;
