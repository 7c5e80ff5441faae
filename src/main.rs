//! Node balancer demo client.
//!
//! Repeatedly picks a node, runs a query against exactly that node and
//! reports the outcome, while the health scheduler keeps liveness fresh.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                        NODE BALANCER                          │
//!   │                                                               │
//!   │  ┌──────────────┐  snapshot   ┌────────────┐   binding        │
//!   │  │   registry   │────────────▶│  policy    │──────────┐       │
//!   │  │ (ArcSwap COW)│             │ rr/random  │          │       │
//!   │  └──────▲───────┘             └────────────┘          ▼       │
//!   │         │ commit (cycle #)                    ┌────────────┐  │
//!   │  ┌──────┴───────┐                             │  executor  │──┼──▶ bound node
//!   │  │   health     │──── probe ─────────────────▶│  (query)   │  │
//!   │  │  scheduler   │                             └─────┬──────┘  │
//!   │  └──────────────┘          fast demotion            │         │
//!   │         ▲◀──────────────────────────────────────────┘         │
//!   │  ┌──────┴───────┐                                             │
//!   │  │  discovery   │ (config watcher, optional)                  │
//!   │  └──────────────┘                                             │
//!   └──────────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use node_balancer::config::loader::{load_config, ConfigError};
use node_balancer::config::validation::validate_config;
use node_balancer::config::{BalancerConfig, ClientConfig, PolicyKind};
use node_balancer::health::NodeProbe;
use node_balancer::lifecycle::{self, signals};
use node_balancer::net::{NodeClient, NodeClientError, QueryExecutor};
use node_balancer::observability::{logging, metrics};
use node_balancer::resilience::Backoff;
use node_balancer::{BalancerError, Executor, LoadBalancer};

#[derive(Parser)]
#[command(name = "node-balancer")]
#[command(about = "Health-aware client-side balancer for multi-node databases", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated endpoints, e.g. "http://localhost:8123,localhost:8124"
    #[arg(short, long)]
    endpoints: Option<String>,

    /// Load balancing policy (random, round-robin, first-alive)
    #[arg(short, long)]
    policy: Option<PolicyKind>,

    /// Stop after this many requests
    #[arg(short = 'n', long)]
    requests: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BalancerConfig::default(),
    };
    if let Some(endpoints) = cli.endpoints {
        config.balancer.endpoints = vec![endpoints];
    }
    if let Some(policy) = cli.policy {
        config.balancer.load_balancing_policy = policy;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("node-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = NodeClient::new(Duration::from_millis(config.client.request_timeout_ms));
    let probe = NodeProbe::new(client.clone(), config.health_check.path.clone());
    let running = lifecycle::start(&config, probe, cli.config.as_deref()).await?;

    let shutdown = running.shutdown_handle();
    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    let executor = QueryExecutor::new(client);
    run_client(
        &running.balancer,
        &executor,
        &config.client,
        cli.requests,
        shutdown.subscribe(),
    )
    .await;

    running.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Select, bind, execute, report; once per interval until shutdown.
async fn run_client(
    balancer: &LoadBalancer,
    executor: &QueryExecutor,
    config: &ClientConfig,
    limit: Option<u64>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let interval = Duration::from_millis(config.request_interval_ms);
    let mut backoff = Backoff::new(config.backoff_base_ms, config.backoff_max_ms);
    let mut sent: u64 = 0;

    while limit.map_or(true, |max| sent < max) {
        tracing::info!("check: {}", balancer.registry().snapshot().describe());

        let delay = match balancer.select_and_bind() {
            Ok(mut binding) => {
                backoff.reset();
                sent += 1;
                match binding.consume() {
                    Ok(node) => {
                        let result = executor.execute(&node, config.query.clone()).await;
                        match &result {
                            Ok(body) if *body == config.expected_response => {
                                tracing::info!(sequence = binding.sequence(), node = %node, "Query succeeded");
                            }
                            Ok(body) => {
                                tracing::error!(node = %node, response = %body, "Unexpected query response");
                            }
                            Err(e) => {
                                tracing::error!(sequence = binding.sequence(), node = %node, error = %e, "Query failed");
                            }
                        }
                        let success = answered_as_expected(&result, &config.expected_response);
                        if let Err(e) = balancer.report_outcome(&mut binding, success) {
                            tracing::error!(error = %e, "Outcome report rejected");
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Binding rejected"),
                }
                interval
            }
            Err(BalancerError::NoHealthyNodes { known }) => {
                let delay = backoff.next_delay();
                tracing::warn!(
                    known,
                    retry_in_ms = delay.as_millis() as u64,
                    "No healthy node available"
                );
                delay
            }
            Err(e) => {
                tracing::error!(error = %e, "Selection failed");
                interval
            }
        };

        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = shutdown.recv() => break,
        }
    }
}

/// A node that answers with anything but the expected body counts as failed.
fn answered_as_expected(result: &Result<String, NodeClientError>, expected: &str) -> bool {
    matches!(result, Ok(body) if body == expected)
}
