//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Registry, scheduler and balancer produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`node`, `cycle`, `sequence`) on every event
//! - Metrics are cheap and no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
