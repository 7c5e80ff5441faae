//! Periodic health scheduler.
//!
//! # Responsibilities
//! - Run one health cycle per interval, never two at once
//! - Probe targets concurrently with a per-probe timeout
//! - Commit results to the registry tagged with the cycle number
//! - Apply discovered node lists between cycles

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::discovery::DiscoveryUpdates;
use crate::error::ProbeError;
use crate::health::probe::HealthProbe;
use crate::health::state::ProbeVerdict;
use crate::observability::metrics;
use crate::registry::node::{Liveness, NodeIdentity, NodeRecord};
use crate::registry::store::{CommitOutcome, NodeRegistry};

/// A liveness change observed during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub node: NodeIdentity,
    pub from: Liveness,
    pub to: Liveness,
}

/// What one health cycle did.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: u64,
    /// Nodes a probe was dispatched to.
    pub probed: usize,
    /// Nodes healthy once the cycle finished.
    pub healthy: Vec<NodeIdentity>,
    /// Nodes not healthy once the cycle finished.
    pub faulty: Vec<NodeIdentity>,
    pub transitions: Vec<Transition>,
    /// Results discarded because a newer cycle had started or the node was
    /// demoted while the probe was in flight.
    pub stale: usize,
    /// Results discarded because the node was removed mid-cycle.
    pub orphaned: usize,
    pub added: Vec<NodeIdentity>,
    pub removed: Vec<NodeIdentity>,
}

pub struct HealthScheduler<P> {
    registry: Arc<NodeRegistry>,
    probe: Arc<P>,
    config: HealthCheckConfig,
    limiter: Arc<Semaphore>,
    discovery: Option<DiscoveryUpdates>,
    last_cycle_at: Option<Instant>,
}

impl<P: HealthProbe> HealthScheduler<P> {
    pub fn new(registry: Arc<NodeRegistry>, probe: P, config: HealthCheckConfig) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_probes.max(1)));
        Self {
            registry,
            probe: Arc::new(probe),
            config,
            limiter,
            discovery: None,
            last_cycle_at: None,
        }
    }

    /// Reconcile the registry from `updates` before each cycle.
    pub fn with_discovery(mut self, updates: DiscoveryUpdates) -> Self {
        self.discovery = Some(updates);
        self
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Run cycles on the configured interval until shutdown.
    ///
    /// The first cycle starts immediately, or one interval after the last
    /// explicitly driven cycle. A cycle in progress at shutdown is abandoned
    /// and its in-flight probes are aborted.
    ///
    /// With health checks disabled the loop only keeps running to apply
    /// discovered node lists, and exits at once when there is no discovery.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled && self.discovery.is_none() {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_ms = self.config.interval_ms,
            timeout_ms = self.config.timeout_ms,
            check_all_nodes = self.config.check_all_nodes,
            failure_threshold = self.config.consecutive_failure_threshold,
            "Health scheduler starting"
        );

        let period = Duration::from_millis(self.config.interval_ms.max(1));
        let first_tick = match self.last_cycle_at {
            Some(at) => time::Instant::from_std(at + period),
            None => time::Instant::now(),
        };
        let mut ticker = time::interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.run_cycle() => {}
                        _ = shutdown.recv() => {
                            tracing::info!("Health scheduler received shutdown signal mid-cycle, abandoning probes");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run a single health cycle to completion.
    ///
    /// With health checks disabled no probe is sent; nodes that were never
    /// checked are trusted as `Healthy` instead.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let started = Instant::now();
        self.last_cycle_at = Some(started);
        let mut report = CycleReport::default();

        if let Some(nodes) = self.discovery.as_mut().and_then(DiscoveryUpdates::latest) {
            let (added, removed) = self.registry.reconcile(&nodes);
            if !added.is_empty() || !removed.is_empty() {
                tracing::info!(added = added.len(), removed = removed.len(), "Node set reconciled from discovery");
            }
            report.added = added;
            report.removed = removed;
        }

        let cycle = self.registry.begin_cycle();
        report.cycle = cycle;

        if !self.config.enabled {
            for node in self.registry.trust_unknown() {
                report.transitions.push(Transition {
                    node,
                    from: Liveness::Unknown,
                    to: Liveness::Healthy,
                });
            }
            let snapshot = self.registry.snapshot();
            report.healthy = snapshot.healthy().iter().map(|r| r.identity().clone()).collect();
            report.faulty = snapshot.faulty().iter().map(|r| r.identity().clone()).collect();
            return report;
        }

        let check_all = self.config.check_all_nodes;
        let targets: Vec<NodeRecord> = self
            .registry
            .snapshot()
            .iter()
            .filter(|r| check_all || !r.is_healthy())
            .cloned()
            .collect();
        report.probed = targets.len();

        let timeout = Duration::from_millis(self.config.timeout_ms);
        let mut tasks = JoinSet::new();
        for record in targets {
            let probe = self.probe.clone();
            let limiter = self.limiter.clone();
            tasks.spawn(async move {
                let _permit = limiter.acquire_owned().await.ok();
                let probe_started = Instant::now();
                let result = match time::timeout(timeout, probe.probe(record.identity())).await {
                    Ok(result) => result,
                    Err(_) => Err(ProbeError::Timeout(timeout)),
                };
                (record, result, probe_started.elapsed())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((record, result, elapsed)) => self.commit(cycle, &record, result, elapsed, &mut report),
                Err(e) => tracing::error!(cycle, error = %e, "Probe task failed"),
            }
        }

        let snapshot = self.registry.snapshot();
        report.healthy = snapshot.healthy().iter().map(|r| r.identity().clone()).collect();
        report.faulty = snapshot.faulty().iter().map(|r| r.identity().clone()).collect();

        let elapsed = started.elapsed();
        metrics::record_health_cycle(elapsed, report.probed);
        tracing::debug!(
            cycle,
            probed = report.probed,
            elapsed_ms = elapsed.as_millis() as u64,
            "check: {}",
            snapshot.describe()
        );

        report
    }

    fn commit(
        &self,
        cycle: u64,
        record: &NodeRecord,
        result: Result<(), ProbeError>,
        elapsed: Duration,
        report: &mut CycleReport,
    ) {
        let node = record.identity();
        let node_label = node.to_string();

        let verdict = match &result {
            Ok(()) => {
                metrics::record_probe(&node_label, "healthy", elapsed);
                ProbeVerdict::Success
            }
            Err(e @ ProbeError::Timeout(_)) => {
                tracing::warn!(node = %node, cycle, error = %e, "Health check failed: timeout");
                metrics::record_probe(&node_label, "timeout", elapsed);
                ProbeVerdict::Failure
            }
            Err(e @ ProbeError::Failed(_)) => {
                tracing::warn!(node = %node, cycle, error = %e, "Health check failed");
                metrics::record_probe(&node_label, "failed", elapsed);
                ProbeVerdict::Failure
            }
        };

        let outcome = self.registry.commit_probe(
            record,
            cycle,
            verdict,
            self.config.consecutive_failure_threshold,
        );

        match outcome {
            CommitOutcome::Applied { from, to } if from != to => {
                tracing::info!(node = %node, cycle, from = from.as_str(), to = to.as_str(), "Liveness changed");
                metrics::record_node_liveness(&node_label, to);
                report.transitions.push(Transition {
                    node: node.clone(),
                    from,
                    to,
                });
            }
            CommitOutcome::Applied { .. } => {}
            CommitOutcome::Stale => {
                tracing::debug!(node = %node, cycle, "Discarding probe result overtaken by a newer cycle or demotion");
                metrics::record_stale_probe_result();
                report.stale += 1;
            }
            CommitOutcome::Unknown => {
                tracing::debug!(node = %node, cycle, "Discarding probe result for removed node");
                report.orphaned += 1;
            }
        }
    }
}
