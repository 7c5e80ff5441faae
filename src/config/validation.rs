//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, thresholds >= 1)
//! - Check every endpoint parses into a node identity
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::BalancerConfig;
use crate::registry::node::NodeIdentity;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("no endpoints configured and auto discovery is disabled")]
    NoEndpoints,

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let health = &config.health_check;

    let positive = [
        ("health_check.interval_ms", health.interval_ms == 0),
        ("health_check.timeout_ms", health.timeout_ms == 0),
        (
            "health_check.consecutive_failure_threshold",
            health.consecutive_failure_threshold == 0,
        ),
        ("health_check.max_concurrent_probes", health.max_concurrent_probes == 0),
        ("client.request_timeout_ms", config.client.request_timeout_ms == 0),
    ];
    for (field, is_zero) in positive {
        if is_zero {
            errors.push(ValidationError::NotPositive(field));
        }
    }

    let mut parsed = 0;
    let mut invalid = false;
    for entry in &config.balancer.endpoints {
        match NodeIdentity::parse_list(entry, config.balancer.default_protocol) {
            Ok(nodes) => parsed += nodes.len(),
            Err(e) => {
                invalid = true;
                errors.push(ValidationError::InvalidEndpoint {
                    endpoint: entry.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    if parsed == 0 && !invalid && !config.discovery.auto_discovery {
        errors.push(ValidationError::NoEndpoints);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
