//! Node registry subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoint list / discovery
//!     → store.rs add_node / remove_node / reconcile
//!
//! Health scheduler and fast demotion
//!     → store.rs (serialized writers, copy-on-write swap)
//!
//! Selectors
//!     → snapshot.rs (lock-free load of the current node list)
//! ```
//!
//! # Design Decisions
//! - Records are immutable values; every write swaps in a new list
//! - Readers never block on writers or on in-flight probes
//! - Re-adding a node starts a new incarnation with Unknown liveness

pub mod node;
pub mod snapshot;
pub mod store;

pub use node::{Liveness, NodeIdentity, NodeRecord, Protocol};
pub use snapshot::Snapshot;
pub use store::{CommitOutcome, NodeRegistry};
