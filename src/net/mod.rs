//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Health probe / request execution
//!     → client.rs (hyper HTTP client or raw TCP connect)
//!     → Node named by the caller (probe target or bound node)
//! ```
//!
//! # Design Decisions
//! - The network layer never chooses a node; it is always handed one
//! - Every outbound call carries a deadline

pub mod client;

pub use client::{NodeClient, NodeClientError, QueryExecutor};
