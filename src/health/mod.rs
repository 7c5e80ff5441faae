//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduled checks (scheduler.rs):
//!     Interval tick
//!     → Registry snapshot (all nodes, or only non-healthy ones)
//!     → probe.rs against each target, concurrently, with timeout
//!     → state.rs transition, committed with the cycle number
//!
//! Fast demotion (load_balancer):
//!     Failed execution on a bound node
//!     → Node marked Unhealthy immediately
//!
//! State machine (state.rs):
//!     Unknown → Healthy / Unhealthy
//!     Healthy ←→ Unhealthy, thresholded on the way down
//! ```
//!
//! # Design Decisions
//! - Cycles never overlap; results from a superseded cycle are dropped
//! - Probe failures never reach selection callers
//! - Health state is per-node and per-incarnation

pub mod probe;
pub mod scheduler;
pub mod state;

pub use probe::{HealthProbe, NodeProbe};
pub use scheduler::{CycleReport, HealthScheduler, Transition};
