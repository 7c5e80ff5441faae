//! Immutable point-in-time view of the registry.

use std::sync::Arc;

use crate::registry::node::{NodeIdentity, NodeRecord};

/// Ordered node records captured at one instant.
///
/// Cloning is cheap (shared `Arc`); the contents never change after capture.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    nodes: Arc<Vec<NodeRecord>>,
}

impl Snapshot {
    pub(crate) fn new(nodes: Arc<Vec<NodeRecord>>) -> Self {
        Self { nodes }
    }

    pub fn records(&self) -> &[NodeRecord] {
        &self.nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, identity: &NodeIdentity) -> Option<&NodeRecord> {
        self.nodes.iter().find(|r| r.identity() == identity)
    }

    /// Records whose liveness is `Healthy`, in registry order.
    pub fn healthy(&self) -> Vec<NodeRecord> {
        self.nodes.iter().filter(|r| r.is_healthy()).cloned().collect()
    }

    /// One-line `nodes:[..], faulty:[..]` summary for logs.
    pub fn describe(&self) -> String {
        let join = |healthy: bool| {
            self.nodes
                .iter()
                .filter(|r| r.is_healthy() == healthy)
                .map(|r| r.identity().authority())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("nodes:[{}], faulty:[{}]", join(true), join(false))
    }

    /// Records whose liveness is anything but `Healthy`, in registry order.
    pub fn faulty(&self) -> Vec<NodeRecord> {
        self.nodes.iter().filter(|r| !r.is_healthy()).cloned().collect()
    }
}
