//! Copy-on-write node registry.
//!
//! # Responsibilities
//! - Own the ordered set of tracked nodes
//! - Hand out lock-free snapshots to selectors
//! - Serialize liveness writes and reject stale probe results

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::error::{BalancerError, BalancerResult};
use crate::health::state::{next_liveness, ProbeVerdict};
use crate::observability::metrics;
use crate::registry::node::{Liveness, NodeIdentity, NodeRecord};
use crate::registry::snapshot::Snapshot;

/// Result of committing one scheduler probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The record was rewritten.
    Applied { from: Liveness, to: Liveness },
    /// The result belongs to a cycle that is no longer current.
    Stale,
    /// The node (or this incarnation of it) is no longer registered.
    Unknown,
}

/// The set of tracked nodes and their liveness.
#[derive(Debug)]
pub struct NodeRegistry {
    nodes: ArcSwap<Vec<NodeRecord>>,
    /// Serializes writers; readers never take it.
    write_lock: Mutex<()>,
    next_incarnation: AtomicU64,
    current_cycle: AtomicU64,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
            next_incarnation: AtomicU64::new(1),
            current_cycle: AtomicU64::new(0),
        }
    }

    /// Build a registry seeded with `identities`, all `Unknown`.
    pub fn with_nodes(identities: impl IntoIterator<Item = NodeIdentity>) -> Self {
        let registry = Self::new();
        for identity in identities {
            registry.add_node(identity);
        }
        registry
    }

    /// Consistent immutable view of all nodes. Never blocks.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.nodes.load_full())
    }

    pub fn get(&self, identity: &NodeIdentity) -> Option<NodeRecord> {
        self.nodes.load().iter().find(|r| r.identity() == identity).cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.load().is_empty()
    }

    /// Track `identity`. Returns false if it was already tracked.
    ///
    /// A fresh record always starts `Unknown`; nothing is carried over from a
    /// previous registration of the same identity.
    pub fn add_node(&self, identity: NodeIdentity) -> bool {
        let _guard = self.lock();
        let current = self.nodes.load();
        if current.iter().any(|r| *r.identity() == identity) {
            return false;
        }

        let incarnation = self.next_incarnation.fetch_add(1, Ordering::Relaxed);
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        tracing::info!(node = %identity, incarnation, "Node added");
        metrics::record_node_liveness(&identity.to_string(), Liveness::Unknown);
        next.push(NodeRecord::new(Arc::new(identity), incarnation));
        self.nodes.store(Arc::new(next));
        true
    }

    /// Stop tracking `identity`. Returns false if it was not tracked.
    pub fn remove_node(&self, identity: &NodeIdentity) -> bool {
        let _guard = self.lock();
        let current = self.nodes.load();
        if !current.iter().any(|r| r.identity() == identity) {
            return false;
        }

        let next: Vec<NodeRecord> = current
            .iter()
            .filter(|r| r.identity() != identity)
            .cloned()
            .collect();
        self.nodes.store(Arc::new(next));
        tracing::info!(node = %identity, "Node removed");
        true
    }

    /// Make the tracked set equal to `identities`, preserving the state of
    /// nodes present in both. Returns `(added, removed)`.
    ///
    /// The whole change is published as one swap, so readers see either the
    /// old set or the new one.
    pub fn reconcile(&self, identities: &[NodeIdentity]) -> (Vec<NodeIdentity>, Vec<NodeIdentity>) {
        let _guard = self.lock();
        let current = self.nodes.load();

        let mut next = Vec::with_capacity(identities.len());
        let mut removed = Vec::new();
        for record in current.iter() {
            if identities.contains(record.identity()) {
                next.push(record.clone());
            } else {
                removed.push(record.identity().clone());
            }
        }

        let mut added = Vec::new();
        for identity in identities {
            if next.iter().any(|r| r.identity() == identity) {
                continue;
            }
            let incarnation = self.next_incarnation.fetch_add(1, Ordering::Relaxed);
            next.push(NodeRecord::new(Arc::new(identity.clone()), incarnation));
            added.push(identity.clone());
        }

        if added.is_empty() && removed.is_empty() {
            return (added, removed);
        }
        self.nodes.store(Arc::new(next));

        for identity in &removed {
            tracing::info!(node = %identity, "Node removed");
        }
        for identity in &added {
            tracing::info!(node = %identity, "Node added");
            metrics::record_node_liveness(&identity.to_string(), Liveness::Unknown);
        }
        (added, removed)
    }

    /// Mark every `Unknown` node `Healthy` in one write. Returns the nodes
    /// that changed.
    ///
    /// Used when active health checks are off, leaving fast demotion as the
    /// only liveness feedback.
    pub fn trust_unknown(&self) -> Vec<NodeIdentity> {
        let _guard = self.lock();
        let current = self.nodes.load();
        let trusted: Vec<NodeIdentity> = current
            .iter()
            .filter(|r| r.liveness == Liveness::Unknown)
            .map(|r| r.identity().clone())
            .collect();
        if trusted.is_empty() {
            return trusted;
        }

        let next: Vec<NodeRecord> = current
            .iter()
            .cloned()
            .map(|mut record| {
                if record.liveness == Liveness::Unknown {
                    record.liveness = Liveness::Healthy;
                }
                record
            })
            .collect();
        self.nodes.store(Arc::new(next));

        for identity in &trusted {
            tracing::info!(node = %identity, "Node trusted without health checks");
            metrics::record_node_liveness(&identity.to_string(), Liveness::Healthy);
        }
        trusted
    }

    /// Overwrite a node's liveness directly (last writer wins).
    pub fn update_liveness(&self, identity: &NodeIdentity, healthy: bool) -> BalancerResult<Liveness> {
        self.rewrite(identity, None, |record| {
            if healthy {
                record.liveness = Liveness::Healthy;
                record.consecutive_failures = 0;
            } else {
                record.liveness = Liveness::Unhealthy;
                record.consecutive_failures = record.consecutive_failures.saturating_add(1);
            }
            record.last_checked_at = Some(Instant::now());
        })
        .map(|(_, to)| to)
        .ok_or_else(|| {
            tracing::warn!(node = %identity, "Liveness update for unknown node ignored");
            BalancerError::UnknownNode(identity.to_string())
        })
    }

    /// Fast-path demotion after a failed execution.
    ///
    /// Only applies to the incarnation that was bound; returns true if the
    /// node transitioned to `Unhealthy`. Probe results dispatched before the
    /// demotion are rejected when they come back.
    pub fn demote(&self, identity: &NodeIdentity, incarnation: u64) -> bool {
        let outcome = self.rewrite(identity, Some(incarnation), |record| {
            record.demotions = record.demotions.saturating_add(1);
            if record.liveness != Liveness::Unhealthy {
                record.liveness = Liveness::Unhealthy;
                record.consecutive_failures = record.consecutive_failures.saturating_add(1);
            }
        });

        match outcome {
            Some((from, Liveness::Unhealthy)) if from != Liveness::Unhealthy => true,
            Some(_) => false,
            None => {
                tracing::debug!(node = %identity, incarnation, "Demotion target no longer registered");
                false
            }
        }
    }

    /// Open a new health cycle. Results from older cycles are rejected from now on.
    pub(crate) fn begin_cycle(&self) -> u64 {
        let _guard = self.lock();
        self.current_cycle.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn current_cycle(&self) -> u64 {
        self.current_cycle.load(Ordering::Acquire)
    }

    /// Apply a scheduler probe result with hysteresis.
    ///
    /// `dispatched` is the record as it was when the probe was sent. The
    /// result is stale if its cycle is over or the node was demoted since.
    pub(crate) fn commit_probe(
        &self,
        dispatched: &NodeRecord,
        cycle: u64,
        verdict: ProbeVerdict,
        failure_threshold: u32,
    ) -> CommitOutcome {
        let _guard = self.lock();
        if cycle != self.current_cycle.load(Ordering::Acquire) {
            return CommitOutcome::Stale;
        }

        let current = self.nodes.load();
        let Some(index) = current.iter().position(|r| {
            r.identity() == dispatched.identity() && r.incarnation() == dispatched.incarnation()
        }) else {
            return CommitOutcome::Unknown;
        };
        if current[index].last_cycle > cycle || current[index].demotions != dispatched.demotions {
            return CommitOutcome::Stale;
        }

        let mut record = current[index].clone();
        let from = record.liveness;
        let (to, failures) = next_liveness(from, record.consecutive_failures, verdict, failure_threshold);
        record.liveness = to;
        record.consecutive_failures = failures;
        record.last_checked_at = Some(Instant::now());
        record.last_cycle = cycle;

        let mut next: Vec<NodeRecord> = current.iter().cloned().collect();
        next[index] = record;
        self.nodes.store(Arc::new(next));

        CommitOutcome::Applied { from, to }
    }

    /// Rewrite one record under the write lock. Returns `(from, to)` liveness,
    /// or `None` if no record matched.
    fn rewrite<F>(&self, identity: &NodeIdentity, incarnation: Option<u64>, apply: F) -> Option<(Liveness, Liveness)>
    where
        F: FnOnce(&mut NodeRecord),
    {
        let _guard = self.lock();
        let current = self.nodes.load();
        let index = current.iter().position(|r| {
            r.identity() == identity && incarnation.map_or(true, |i| r.incarnation() == i)
        })?;

        let mut record = current[index].clone();
        let from = record.liveness;
        apply(&mut record);
        let to = record.liveness;

        let mut next: Vec<NodeRecord> = current.iter().cloned().collect();
        next[index] = record;
        self.nodes.store(Arc::new(next));

        if from != to {
            tracing::info!(node = %identity, from = from.as_str(), to = to.as_str(), "Liveness changed");
            metrics::record_node_liveness(&identity.to_string(), to);
        }
        Some((from, to))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
