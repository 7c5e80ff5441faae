//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Caller asks for a node
//!     → balancer.rs takes one registry snapshot
//!     → healthy subset (or full snapshot when degrading)
//!     → Apply selection policy:
//!         - random.rs (uniform, injected RNG)
//!         - round_robin.rs (rotate through candidates)
//!         - first_alive.rs (first candidate in registry order)
//!     → binding.rs (immutable token pinning the chosen node)
//!     → Executor runs against the token's node, outcome reported back
//! ```
//!
//! # Design Decisions
//! - Policies are pure over their input slice plus private counters/RNG
//! - Unhealthy nodes are never chosen unless degradation is configured
//! - The executor never re-resolves a node; it uses the binding verbatim

pub mod balancer;
pub mod binding;
pub mod first_alive;
pub mod random;
pub mod round_robin;

use std::fmt::Debug;

use crate::config::PolicyKind;
use crate::registry::node::NodeRecord;

pub use balancer::{Executor, LoadBalancer};
pub use binding::{BindingState, SelectionBinding};
pub use first_alive::FirstAlive;
pub use random::Random;
pub use round_robin::RoundRobin;

/// Trait for node selection algorithms.
pub trait SelectionPolicy: Send + Sync + Debug {
    /// Choose one of `candidates`, or `None` if there are none.
    fn pick<'a>(&self, candidates: &'a [NodeRecord]) -> Option<&'a NodeRecord>;

    /// Which configured policy this is.
    fn kind(&self) -> PolicyKind;
}

/// Build the policy named by `kind`. `seed` only affects `Random`.
pub fn policy_for(kind: PolicyKind, seed: Option<u64>) -> Box<dyn SelectionPolicy> {
    match kind {
        PolicyKind::Random => match seed {
            Some(seed) => Box::new(Random::seeded(seed)),
            None => Box::new(Random::from_entropy()),
        },
        PolicyKind::RoundRobin => Box::new(RoundRobin::new()),
        PolicyKind::FirstAlive => Box::new(FirstAlive::new()),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::registry::node::{Liveness, NodeIdentity, NodeRecord, Protocol};

    pub fn healthy(port: u16) -> NodeRecord {
        let mut record = NodeRecord::new(Arc::new(NodeIdentity::new(Protocol::Http, "localhost", port)), port as u64);
        record.liveness = Liveness::Healthy;
        record
    }
}
