//! Node identity and per-node liveness record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

use crate::error::{BalancerError, BalancerResult};

/// Protocol a node is reached over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Tcp,
    Grpc,
}

impl Protocol {
    /// Port assumed when an endpoint string omits one.
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Http => 8123,
            Protocol::Tcp => 9000,
            Protocol::Grpc => 9100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Tcp => "tcp",
            Protocol::Grpc => "grpc",
        }
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Http
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "tcp" => Ok(Protocol::Tcp),
            "grpc" => Ok(Protocol::Grpc),
            other => Err(format!("unsupported protocol '{}'", other)),
        }
    }
}

/// Immutable endpoint descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdentity {
    protocol: Protocol,
    host: String,
    port: u16,
}

impl NodeIdentity {
    pub fn new(protocol: Protocol, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol,
            host: host.into().to_ascii_lowercase(),
            port,
        }
    }

    /// Parse `proto://host:port`, `host:port` or `host`.
    ///
    /// Missing parts fall back to `default_protocol` and its default port.
    pub fn parse(endpoint: &str, default_protocol: Protocol) -> BalancerResult<Self> {
        let trimmed = endpoint.trim();
        let invalid = |reason: String| BalancerError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(invalid("empty endpoint".into()));
        }

        let (protocol, rest) = match trimmed.split_once("://") {
            Some((scheme, rest)) => (scheme.parse::<Protocol>().map_err(invalid)?, rest),
            None => (default_protocol, trimmed),
        };

        // A non-special scheme keeps explicit ports verbatim (no :80 elision).
        let url = Url::parse(&format!("node://{}", rest)).map_err(|e| invalid(e.to_string()))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".into()))?;
        let port = url.port().unwrap_or_else(|| protocol.default_port());

        Ok(Self::new(protocol, host, port))
    }

    /// Parse a comma-separated endpoint list, dropping duplicates and blanks.
    pub fn parse_list(list: &str, default_protocol: Protocol) -> BalancerResult<Vec<Self>> {
        let mut nodes: Vec<Self> = Vec::new();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let node = Self::parse(part, default_protocol)?;
            if !nodes.contains(&node) {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` form, used for socket connects.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Registry belief about a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Liveness {
    Unknown,
    Healthy,
    Unhealthy,
}

impl Liveness {
    pub fn as_str(self) -> &'static str {
        match self {
            Liveness::Unknown => "unknown",
            Liveness::Healthy => "healthy",
            Liveness::Unhealthy => "unhealthy",
        }
    }
}

/// A single tracked node as seen in one snapshot.
///
/// Records are values: the registry never mutates one in place, it swaps in
/// a rebuilt copy, so a record held by a reader never changes under it.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub(crate) identity: Arc<NodeIdentity>,
    pub(crate) incarnation: u64,
    pub(crate) liveness: Liveness,
    pub(crate) consecutive_failures: u32,
    pub(crate) last_checked_at: Option<Instant>,
    pub(crate) last_cycle: u64,
    /// Bumped by every fast demotion of this incarnation.
    pub(crate) demotions: u64,
}

impl NodeRecord {
    pub(crate) fn new(identity: Arc<NodeIdentity>, incarnation: u64) -> Self {
        Self {
            identity,
            incarnation,
            liveness: Liveness::Unknown,
            consecutive_failures: 0,
            last_checked_at: None,
            last_cycle: 0,
            demotions: 0,
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Shared handle to the identity, cheap to move into bindings and tasks.
    pub fn identity_arc(&self) -> Arc<NodeIdentity> {
        self.identity.clone()
    }

    /// Registry-assigned number distinguishing re-additions of the same identity.
    pub fn incarnation(&self) -> u64 {
        self.incarnation
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn is_healthy(&self) -> bool {
        self.liveness == Liveness::Healthy
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_checked_at(&self) -> Option<Instant> {
        self.last_checked_at
    }

    /// Health cycle whose result was last committed (0 = never probed).
    pub fn last_cycle(&self) -> u64 {
        self.last_cycle
    }

    /// Number of failed executions that demoted this incarnation.
    pub fn demotions(&self) -> u64 {
        self.demotions
    }
}
