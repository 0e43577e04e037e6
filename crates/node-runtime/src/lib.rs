//! # Node Runtime Library
//!
//! Wiring and HTTP ingress of the tournament platform node. The binary in
//! `main.rs` is a thin shell around [`NodeRuntime`]; everything is exposed
//! here so the workspace tests can drive a node in-process.
//!
//! ## Modules
//!
//! - `container/` - configuration and subsystem wiring
//! - `adapters/` - identity provider and the standings cache bridge
//! - `http/` - routes, bearer authentication, error mapping
//! - `runtime` - subscriber task and HTTP server lifecycle

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod container;
pub mod http;
pub mod runtime;

pub use container::{ConfigError, ContainerError, NodeConfig, SubsystemContainer};
pub use runtime::NodeRuntime;
