//! Startup orchestration.
//!
//! # Responsibilities
//! - Build registry, policy and balancer from configuration
//! - Run one warm-up health cycle so the first selection has data
//!   (or trust every node when health checks are off)
//! - Start the health scheduler and, with auto discovery, the config watcher
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Background tasks start only after the warm-up cycle

use notify::RecommendedWatcher;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::watcher::ConfigWatcher;
use crate::config::BalancerConfig;
use crate::discovery;
use crate::error::BalancerError;
use crate::health::{HealthProbe, HealthScheduler};
use crate::lifecycle::shutdown::Shutdown;
use crate::load_balancer::LoadBalancer;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Balancer setup failed: {0}")]
    Balancer(#[from] BalancerError),

    #[error("Config watcher failed: {0}")]
    Watch(#[from] notify::Error),
}

/// A started balancer with its background tasks.
pub struct Running {
    pub balancer: Arc<LoadBalancer>,
    shutdown: Shutdown,
    scheduler: JoinHandle<()>,
    _watcher: Option<RecommendedWatcher>,
}

impl Running {
    /// Shutdown coordinator shared with the background tasks.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Stop background tasks and wait for the scheduler to exit.
    pub async fn stop(self) {
        self.shutdown.trigger();
        if let Err(e) = self.scheduler.await {
            tracing::error!(error = %e, "Health scheduler task failed");
        }
    }
}

/// Bring up the balancer described by `config`.
///
/// `config_path` is watched for endpoint changes when auto discovery is on.
pub async fn start<P: HealthProbe>(
    config: &BalancerConfig,
    probe: P,
    config_path: Option<&Path>,
) -> Result<Running, StartupError> {
    let balancer = Arc::new(LoadBalancer::from_config(&config.balancer)?);
    tracing::info!(
        nodes = balancer.registry().len(),
        policy = %balancer.policy(),
        "Load balancer initialized"
    );

    let shutdown = Shutdown::new();
    let mut scheduler = HealthScheduler::new(balancer.registry().clone(), probe, config.health_check.clone());

    let mut watcher = None;
    if config.discovery.auto_discovery {
        let (feed, updates) = discovery::channel();
        scheduler = scheduler.with_discovery(updates);

        if let Some(path) = config_path {
            let (config_watcher, config_updates) = ConfigWatcher::new(path);
            watcher = Some(config_watcher.run()?);
            tokio::spawn(discovery::forward_config_updates(config_updates, feed));
        } else {
            tracing::warn!("Auto discovery enabled without a config file; node set stays static");
        }
    }

    // With health checks off this trusts every configured node instead.
    let report = scheduler.run_cycle().await;
    tracing::info!(
        healthy = report.healthy.len(),
        faulty = report.faulty.len(),
        probed = report.probed,
        "Warm-up health cycle complete"
    );

    let scheduler = tokio::spawn(scheduler.run(shutdown.subscribe()));

    Ok(Running {
        balancer,
        shutdown,
        scheduler,
        _watcher: watcher,
    })
}
