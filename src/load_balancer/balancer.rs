//! Binding-based load balancer.
//!
//! # Responsibilities
//! - Select one node per request from a single consistent snapshot
//! - Pin the choice in a `SelectionBinding` the executor must use
//! - Demote a bound node immediately when its execution fails

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::{PolicyKind, SelectionConfig};
use crate::error::{BalancerError, BalancerResult};
use crate::load_balancer::binding::SelectionBinding;
use crate::load_balancer::{policy_for, SelectionPolicy};
use crate::observability::metrics;
use crate::registry::node::{NodeIdentity, NodeRecord};
use crate::registry::store::NodeRegistry;

/// Runs a request against one specific node.
///
/// Implementations must contact exactly `node` and nothing else.
pub trait Executor<Req>: Send + Sync {
    type Output;
    type Error: Into<Box<dyn std::error::Error + Send + Sync>>;

    fn execute(
        &self,
        node: &NodeIdentity,
        request: Req,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Health-aware node selector.
#[derive(Debug)]
pub struct LoadBalancer {
    registry: Arc<NodeRegistry>,
    policy: Box<dyn SelectionPolicy>,
    degrade_to_any_node: bool,
    sequence: AtomicU64,
}

impl LoadBalancer {
    pub fn new(registry: Arc<NodeRegistry>, policy: Box<dyn SelectionPolicy>) -> Self {
        Self {
            registry,
            policy,
            degrade_to_any_node: false,
            sequence: AtomicU64::new(0),
        }
    }

    /// Pick from every known node when none is healthy, instead of failing.
    pub fn with_degrade_to_any_node(mut self, enabled: bool) -> Self {
        self.degrade_to_any_node = enabled;
        self
    }

    /// Build a registry from the configured endpoints plus the configured policy.
    pub fn from_config(config: &SelectionConfig) -> BalancerResult<Self> {
        let registry = Arc::new(NodeRegistry::with_nodes(config.nodes()?));
        let policy = policy_for(config.load_balancing_policy, config.random_seed);
        Ok(Self::new(registry, policy).with_degrade_to_any_node(config.degrade_to_any_node))
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> PolicyKind {
        self.policy.kind()
    }

    /// Choose a node without creating a binding.
    pub fn select(&self) -> BalancerResult<NodeRecord> {
        let snapshot = self.registry.snapshot();
        let healthy = snapshot.healthy();

        let chosen = if !healthy.is_empty() {
            self.policy.pick(&healthy).cloned()
        } else if self.degrade_to_any_node && !snapshot.is_empty() {
            tracing::warn!(known = snapshot.len(), "No healthy nodes, degrading to any known node");
            self.policy.pick(snapshot.records()).cloned()
        } else {
            None
        };

        match chosen {
            Some(record) => {
                metrics::record_selection(self.policy.kind().as_str(), &record.identity().to_string());
                Ok(record)
            }
            None => {
                tracing::debug!(known = snapshot.len(), "No healthy nodes available");
                metrics::record_no_healthy_nodes();
                Err(BalancerError::NoHealthyNodes {
                    known: snapshot.len(),
                })
            }
        }
    }

    /// Choose a node and pin it for one request.
    pub fn select_and_bind(&self) -> BalancerResult<SelectionBinding> {
        let record = self.select()?;
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(sequence, node = %record.identity(), "Node bound");
        Ok(SelectionBinding::new(
            record.identity_arc(),
            record.incarnation(),
            sequence,
        ))
    }

    /// Record how the execution on a consumed binding went.
    ///
    /// A failure demotes the bound node right away, ahead of the next health
    /// cycle.
    pub fn report_outcome(&self, binding: &mut SelectionBinding, success: bool) -> BalancerResult<()> {
        binding.settle(success)?;

        if !success && self.registry.demote(binding.node(), binding.incarnation()) {
            tracing::warn!(
                node = %binding.node(),
                sequence = binding.sequence(),
                "Node demoted after failed execution"
            );
            metrics::record_fast_demotion(&binding.node().to_string());
        }
        Ok(())
    }

    /// Bind a node, run `request` on it through `executor`, report the outcome.
    pub async fn execute<E, Req>(&self, executor: &E, request: Req) -> BalancerResult<E::Output>
    where
        E: Executor<Req>,
    {
        let mut binding = self.select_and_bind()?;
        let node = binding.consume()?;

        let result = executor.execute(&node, request).await;
        self.report_outcome(&mut binding, result.is_ok())?;

        result.map_err(|e| BalancerError::Execution {
            node: node.to_string(),
            source: e.into(),
        })
    }
}
