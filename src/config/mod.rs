//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → registry seed, scheduler, policy, demo client
//!
//! With auto discovery on:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → discovery feed receives the new endpoint list
//!     → scheduler reconciles the registry between cycles
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the node set is refreshed live
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::BalancerConfig;
pub use schema::ClientConfig;
pub use schema::DiscoveryConfig;
pub use schema::HealthCheckConfig;
pub use schema::ObservabilityConfig;
pub use schema::PolicyKind;
pub use schema::SelectionConfig;
