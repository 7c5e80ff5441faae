//! Liveness probes.
//!
//! # Responsibilities
//! - Define the probe collaborator contract
//! - Provide the default probe: HTTP `/ping` for http nodes, TCP connect otherwise

use std::future::Future;

use crate::error::ProbeError;
use crate::net::client::NodeClient;
use crate::registry::node::{NodeIdentity, Protocol};

/// Runs a single liveness check against one node.
///
/// `Ok(())` means healthy. Timeouts are enforced by the scheduler, so an
/// implementation may simply await its transport.
pub trait HealthProbe: Send + Sync + 'static {
    fn probe(&self, node: &NodeIdentity) -> impl Future<Output = Result<(), ProbeError>> + Send;
}

/// Protocol-aware default probe.
#[derive(Clone)]
pub struct NodeProbe {
    client: NodeClient,
    path: String,
}

impl NodeProbe {
    pub fn new(client: NodeClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }
}

impl HealthProbe for NodeProbe {
    async fn probe(&self, node: &NodeIdentity) -> Result<(), ProbeError> {
        match node.protocol() {
            Protocol::Http => {
                let (status, _) = self
                    .client
                    .http_get(node, &self.path)
                    .await
                    .map_err(|e| ProbeError::Failed(e.to_string()))?;
                if status.is_success() {
                    Ok(())
                } else {
                    Err(ProbeError::Failed(format!("non-success status {}", status)))
                }
            }
            Protocol::Tcp | Protocol::Grpc => self
                .client
                .tcp_connect(node)
                .await
                .map_err(|e| ProbeError::Failed(e.to_string())),
        }
    }
}
