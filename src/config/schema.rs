//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BalancerResult;
use crate::registry::node::{NodeIdentity, Protocol};

/// Root configuration for the node balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Endpoint list and selection policy.
    pub balancer: SelectionConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Node discovery settings.
    pub discovery: DiscoveryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Demo client settings.
    pub client: ClientConfig,
}

/// Node selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Uniform pick among healthy nodes.
    Random,
    /// Rotate through healthy nodes.
    #[serde(alias = "roundRobin")]
    RoundRobin,
    /// First healthy node in registration order.
    #[serde(alias = "firstAlive")]
    FirstAlive,
}

impl PolicyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Random => "random",
            PolicyKind::RoundRobin => "round-robin",
            PolicyKind::FirstAlive => "first-alive",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(PolicyKind::Random),
            "round-robin" | "roundRobin" => Ok(PolicyKind::RoundRobin),
            "first-alive" | "firstAlive" => Ok(PolicyKind::FirstAlive),
            other => Err(format!("unknown load balancing policy '{}'", other)),
        }
    }
}

/// Endpoint list and selection behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Node endpoints (e.g., "http://localhost:8123" or "localhost:8124").
    pub endpoints: Vec<String>,

    /// Protocol assumed for endpoints without a scheme.
    pub default_protocol: Protocol,

    /// Selection policy.
    pub load_balancing_policy: PolicyKind,

    /// Seed for the random policy (entropy when unset).
    pub random_seed: Option<u64>,

    /// Pick from all known nodes when none is healthy instead of failing.
    pub degrade_to_any_node: bool,
}

impl SelectionConfig {
    /// Parse `endpoints` into node identities.
    ///
    /// Each entry may itself be a comma-separated list; duplicates are dropped.
    pub fn nodes(&self) -> BalancerResult<Vec<NodeIdentity>> {
        let mut nodes: Vec<NodeIdentity> = Vec::new();
        for entry in &self.endpoints {
            for node in NodeIdentity::parse_list(entry, self.default_protocol)? {
                if !nodes.contains(&node) {
                    nodes.push(node);
                }
            }
        }
        Ok(nodes)
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "http://localhost:8123".to_string(),
                "localhost:8124".to_string(),
            ],
            default_protocol: Protocol::Http,
            load_balancing_policy: PolicyKind::Random,
            random_seed: None,
            degrade_to_any_node: false,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the background health scheduler.
    pub enabled: bool,

    /// Interval between health cycles in milliseconds.
    pub interval_ms: u64,

    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Probe every node each cycle (false: only nodes not currently healthy).
    pub check_all_nodes: bool,

    /// Consecutive failures before a healthy node is marked unhealthy.
    pub consecutive_failure_threshold: u32,

    /// Upper bound on probes in flight at once.
    pub max_concurrent_probes: usize,

    /// Path requested by the HTTP probe.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1000,
            timeout_ms: 500,
            check_all_nodes: true,
            consecutive_failure_threshold: 3,
            max_concurrent_probes: 16,
            path: "/ping".to_string(),
        }
    }
}

/// Node discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Refresh the node set from the discovery feed between health cycles.
    pub auto_discovery: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Demo client loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Statement sent to the bound node.
    pub query: String,

    /// Expected trimmed response body.
    pub expected_response: String,

    /// Pause between requests in milliseconds.
    pub request_interval_ms: u64,

    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Base delay for exponential backoff when no node is available.
    pub backoff_base_ms: u64,

    /// Maximum backoff delay.
    pub backoff_max_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            query: "select 1".to_string(),
            expected_response: "1".to_string(),
            request_interval_ms: 1000,
            request_timeout_ms: 5000,
            backoff_base_ms: 100,
            backoff_max_ms: 2000,
        }
    }
}
