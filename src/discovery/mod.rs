//! Node discovery hooks.
//!
//! # Data Flow
//! ```text
//! Discovery source (config watcher, service registry, ...)
//!     → feed.rs DiscoveryFeed::publish(node list)
//!     → DiscoveryUpdates (held by the health scheduler)
//!     → NodeRegistry::reconcile between health cycles
//! ```
//!
//! # Design Decisions
//! - Discovery itself is out of scope; any source can publish a full node list
//! - Only the most recent list matters; intermediate lists are skipped
//! - Reconciliation happens between cycles so a cycle never sees the set change

pub mod feed;

pub use feed::{channel, forward_config_updates, DiscoveryFeed, DiscoveryUpdates};
