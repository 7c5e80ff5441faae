//! Error definitions shared across the balancer.

use std::time::Duration;
use thiserror::Error;

use crate::load_balancer::binding::BindingState;

/// Errors surfaced by the registry, selection and binding protocol.
#[derive(Debug, Error)]
pub enum BalancerError {
    /// Selection impossible: no node is currently healthy.
    #[error("No healthy nodes available ({known} known)")]
    NoHealthyNodes { known: usize },

    /// Registry operation referenced a node that was removed or never added.
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// A binding was used outside its CREATED → CONSUMED → outcome lifecycle.
    #[error("Stale binding #{sequence}: cannot {action} a binding in state {state:?}")]
    StaleBinding {
        sequence: u64,
        state: BindingState,
        action: &'static str,
    },

    /// The executor failed against the bound node.
    #[error("Execution against {node} failed: {source}")]
    Execution {
        node: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An endpoint string could not be parsed.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

/// Result type for balancer operations.
pub type BalancerResult<T> = Result<T, BalancerError>;

/// Outcome of a single failed liveness probe.
///
/// Never propagated to selection callers; the scheduler folds it into
/// the node's liveness.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("probe failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BalancerError::NoHealthyNodes { known: 2 };
        assert_eq!(err.to_string(), "No healthy nodes available (2 known)");

        let err = BalancerError::StaleBinding {
            sequence: 7,
            state: BindingState::Consumed,
            action: "consume",
        };
        assert!(err.to_string().contains("#7"));
        assert!(err.to_string().contains("Consumed"));

        let err = ProbeError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "probe timed out after 250ms");
    }
}
