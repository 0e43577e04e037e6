//! # Subsystem Container
//!
//! Configuration and dependency wiring for the node.

pub mod config;
pub mod subsystems;

pub use config::{ApiKeyGrant, AuthConfig, ConfigError, HttpConfig, NodeConfig, TokenGrant};
pub use subsystems::{ContainerError, SubsystemContainer, METRICS_NAMESPACE};
