//! The worker join command printed by the control plane.

use anyhow::Result;

use crate::domain::error::ProvisionError;

/// `kubeadm join ...` command line handed from the control plane to workers.
///
/// Empty when the control plane was already initialized by an earlier run;
/// an empty command means the worker join step is skipped.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct JoinCommand(String);

impl std::fmt::Debug for JoinCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token is a bearer credential.
        if self.0.is_empty() {
            f.write_str("JoinCommand(<empty>)")
        } else {
            f.write_str("JoinCommand(<redacted>)")
        }
    }
}

impl JoinCommand {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pull the join command out of `kubeadm token create --print-join-command`.
    ///
    /// kubeadm may print warnings before the command; the first line
    /// starting with `kubeadm join` is taken, trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::JoinCommandMissing`] when no such line exists.
    pub fn extract(output: &str) -> Result<Self> {
        output
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with("kubeadm join "))
            .map(|l| Self(l.to_string()))
            .ok_or_else(|| ProvisionError::JoinCommandMissing(output.trim().to_string()).into())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
