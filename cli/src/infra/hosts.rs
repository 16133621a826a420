//! Loads the host registry from configuration or the hosts file.

use anyhow::{Context, Result};
use kubestrap_common::HostRegistry;

use crate::domain::ClusterConfig;

/// Inline `hosts:` in the configuration win; otherwise `hosts_file` is read.
///
/// # Errors
///
/// Returns an error if the file cannot be read or yields no hosts.
pub fn load_registry(cfg: &ClusterConfig) -> Result<HostRegistry> {
    if !cfg.hosts.is_empty() {
        let registry = HostRegistry::from_pairs(cfg.hosts.clone());
        return registry
            .non_empty()
            .context("no hosts configured under `hosts:`");
    }
    let text = std::fs::read_to_string(&cfg.hosts_file)
        .with_context(|| format!("cannot read hosts file {}", cfg.hosts_file))?;
    HostRegistry::parse(&text)
        .non_empty()
        .with_context(|| format!("no hosts found in {}", cfg.hosts_file))
}
