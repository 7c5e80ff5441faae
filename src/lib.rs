//! Health-aware client-side node balancer.
//!
//! Tracks the liveness of a set of database nodes, picks one per request
//! and pins that choice in a binding the executor must use verbatim.

pub mod config;
pub mod discovery;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod registry;
pub mod resilience;

pub use config::BalancerConfig;
pub use error::{BalancerError, BalancerResult, ProbeError};
pub use health::{HealthProbe, HealthScheduler};
pub use lifecycle::Shutdown;
pub use load_balancer::{Executor, LoadBalancer, SelectionBinding};
pub use registry::{Liveness, NodeIdentity, NodeRegistry};
