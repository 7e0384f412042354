//! HTTP service for linx-gate.
//!
//! This crate wires the access policy from `common` to the outside world:
//! - Configuration and state (ServiceState: site settings + file store + dedup key)
//! - HTTP handlers (file access, access-key unlock form, health checks)
//! - Process setup (tracing, panic logging, graceful shutdown)

pub mod config;
pub mod http;
pub mod process;
pub mod state;

// Re-export key types for convenience
pub use config::{Config, SiteConfig};
pub use process::spawn_service;
pub use state::{State as ServiceState, StateSetupError};
