//! Cluster roles derived from the host registry.

use anyhow::Result;
use kubestrap_common::{Host, HostRegistry};

use crate::domain::config::TopologyConfig;
use crate::domain::error::ConfigError;

/// Hosts that take part in the cluster: the registry minus excluded labels.
#[must_use]
pub fn cluster_nodes(registry: &HostRegistry, cfg: &TopologyConfig) -> HostRegistry {
    HostRegistry::from_pairs(
        registry
            .iter()
            .filter(|h| !cfg.exclude.contains(&h.label))
            .map(|h| (h.address, h.label)),
    )
}

/// Part a registry entry plays in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    ControlPlane,
    Worker,
    /// Listed in the registry (and its hosts file) but not a cluster node.
    Excluded,
}

impl Role {
    #[must_use]
    pub fn of(host: &Host, cfg: &TopologyConfig) -> Self {
        if cfg.exclude.contains(&host.label) {
            Self::Excluded
        } else if host.label == cfg.control_plane {
            Self::ControlPlane
        } else {
            Self::Worker
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ControlPlane => "control-plane",
            Self::Worker => "worker",
            Self::Excluded => "excluded",
        }
    }
}

/// The control plane and the workers that join it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub control_plane: Host,
    /// Every other cluster node, in registry order.
    pub workers: Vec<Host>,
}

impl Topology {
    /// Split the cluster nodes into control plane and workers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ControlPlaneNotFound`] when no cluster node
    /// carries the configured control-plane label.
    pub fn resolve(registry: &HostRegistry, cfg: &TopologyConfig) -> Result<Self> {
        let nodes = cluster_nodes(registry, cfg);
        let control_plane = nodes.find_by_label(&cfg.control_plane).ok_or_else(|| {
            ConfigError::ControlPlaneNotFound {
                label: cfg.control_plane.clone(),
            }
        })?;
        let workers = nodes.iter().filter(|h| *h != control_plane).collect();
        Ok(Self {
            control_plane,
            workers,
        })
    }
}
