//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use kubestrap_common::RunReport;
use thiserror::Error;

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Errors raised while running provisioning steps on a host.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("'{step}' failed on {host} (exit {code}):\n{output}")]
    CommandFailed {
        host: String,
        step: String,
        code: String,
        output: String,
    },

    #[error("'{step}' on {host}: idempotency probe could not reach the host")]
    ProbeUnreachable { host: String, step: String },

    #[error("'kubeadm token create' printed no 'kubeadm join' line:\n{0}")]
    JoinCommandMissing(String),

    #[error("password transport requested but SSH_PASSWORD is not set")]
    PasswordUnavailable,

    #[error("{phase} failed on {hosts}")]
    RunFailed { phase: String, hosts: String },
}

impl ProvisionError {
    /// The failure of a whole phase, or `None` when every host succeeded.
    #[must_use]
    pub fn run_failed(report: &RunReport) -> Option<Self> {
        let failed = report.failed_hosts();
        if failed.is_empty() {
            return None;
        }
        let hosts: Vec<String> = failed.iter().map(ToString::to_string).collect();
        Some(Self::RunFailed {
            phase: report.phase.clone(),
            hosts: hosts.join(", "),
        })
    }
}

// ── Credential errors ─────────────────────────────────────────────────────────

/// Errors related to SSH credentials loaded at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error(
        "{} must be set as environment variables or in a .env file",
        .0.join(" and ")
    )]
    Missing(Vec<&'static str>),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to cluster configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No host labelled '{label}' in the host list (cluster.control_plane)")]
    ControlPlaneNotFound { label: String },

    #[error("Invalid kubernetes.version '{0}': expected MAJOR.MINOR, e.g. 1.30")]
    InvalidKubernetesVersion(String),

    #[error("Invalid kubernetes.pod_network_cidr '{0}': expected ADDRESS/PREFIX")]
    InvalidPodCidr(String),

    #[error("Invalid {0}: must be greater than zero")]
    ZeroTimeout(&'static str),
}
