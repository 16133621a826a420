//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod credentials;
pub mod error;
pub mod join;
pub mod plan;
pub mod probe;
pub mod remote;
pub mod shell;
pub mod topology;

pub use config::{ClusterConfig, FailurePolicy, HostKeyPolicy, UnreachablePolicy};
pub use credentials::Credentials;
pub use error::{ConfigError, CredentialError, ProvisionError};
pub use join::JoinCommand;
pub use plan::{Op, Step};
pub use probe::{Probe, ProbeCheck, ProbeVerdict};
pub use remote::{CommandOutput, Transport};
pub use topology::{Role, Topology, cluster_nodes};
