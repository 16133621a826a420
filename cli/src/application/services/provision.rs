//! Application service: node provisioning use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use kubestrap_common::{HostRegistry, RunReport};

use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::application::services::runner::{PhaseRunner, RunOptions};
use crate::domain::{ClusterConfig, plan};

/// Provision every host in registry order.
///
/// Each host runs the full node sequence (firewall, certificates, ipv4
/// forwarding, swap, repository, packages, containerd) before the next
/// host starts.
pub async fn provision_nodes(
    exec: &impl RemoteExecutor,
    reporter: &impl ProgressReporter,
    registry: &HostRegistry,
    cfg: &ClusterConfig,
    opts: RunOptions,
) -> RunReport {
    let steps = plan::node_steps(cfg);
    let mut runner = PhaseRunner::new(exec, reporter, opts, "provision");
    for host in registry.iter() {
        if !runner.halted(&host) {
            reporter.step(&format!("provisioning {host}"));
        }
        runner.run_host(&host, &steps).await;
    }
    runner.finish()
}
