//! Selection binding token.
//!
//! # Lifecycle
//! ```text
//! Created ──consume()──▶ Consumed ──report_outcome()──▶ Succeeded | Failed
//! ```
//!
//! Any other step (consuming twice, reporting before consuming, reporting
//! twice) is rejected with `StaleBinding`.

use std::sync::Arc;

use crate::error::{BalancerError, BalancerResult};
use crate::registry::node::NodeIdentity;

/// Where a binding is in its single-use lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Created,
    Consumed,
    Succeeded,
    Failed,
}

/// The node chosen for exactly one request.
///
/// The identity is fixed at selection time and cannot be changed; there is
/// no path from a binding back into the registry.
#[derive(Debug)]
#[must_use = "a binding pins the node a request must be executed against"]
pub struct SelectionBinding {
    node: Arc<NodeIdentity>,
    incarnation: u64,
    sequence: u64,
    state: BindingState,
}

impl SelectionBinding {
    pub(crate) fn new(node: Arc<NodeIdentity>, incarnation: u64, sequence: u64) -> Self {
        Self {
            node,
            incarnation,
            sequence,
            state: BindingState::Created,
        }
    }

    pub fn node(&self) -> &NodeIdentity {
        &self.node
    }

    /// Monotonic selection sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Registry incarnation of the bound node.
    pub fn incarnation(&self) -> u64 {
        self.incarnation
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    /// Mark the binding as used for an execution and hand out the node to contact.
    pub fn consume(&mut self) -> BalancerResult<Arc<NodeIdentity>> {
        if self.state != BindingState::Created {
            return Err(self.stale("consume"));
        }
        self.state = BindingState::Consumed;
        Ok(self.node.clone())
    }

    pub(crate) fn settle(&mut self, success: bool) -> BalancerResult<()> {
        if self.state != BindingState::Consumed {
            return Err(self.stale("report the outcome of"));
        }
        self.state = if success {
            BindingState::Succeeded
        } else {
            BindingState::Failed
        };
        Ok(())
    }

    fn stale(&self, action: &'static str) -> BalancerError {
        tracing::error!(
            sequence = self.sequence,
            node = %self.node,
            state = ?self.state,
            action,
            "Binding used outside its lifecycle"
        );
        BalancerError::StaleBinding {
            sequence: self.sequence,
            state: self.state,
            action,
        }
    }
}
