//! `kubestrap bootstrap`: kubeadm init, worker join, network plugin.

use anyhow::Result;
use kubestrap_common::RunReport;

use crate::app::AppContext;
use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::application::services::bootstrap::{BootstrapOptions, bootstrap_cluster};
use crate::commands::RunArgs;
use crate::domain::{ClusterConfig, Topology};
use crate::infra::hosts::load_registry;
use crate::output::TerminalReporter;

/// Run the bootstrap command.
///
/// # Errors
///
/// Returns an error if loading fails, no host carries the control-plane
/// label, or any step fails.
pub async fn run(app: &AppContext, args: &RunArgs) -> Result<()> {
    let cfg = app.load_config()?;
    let exec = app.executor(&cfg, app.load_credentials(false)?);
    let reporter = TerminalReporter::new(&app.progress);
    let report = bootstrap(&exec, &reporter, &cfg, args).await?;
    drop(reporter);
    app.finish(&report)
}

/// Bootstrap the cluster and return the report without rendering it.
pub(crate) async fn bootstrap(
    exec: &impl RemoteExecutor,
    reporter: &impl ProgressReporter,
    cfg: &ClusterConfig,
    args: &RunArgs,
) -> Result<RunReport> {
    let topology = Topology::resolve(&load_registry(cfg)?, &cfg.cluster)?;
    let kubeconfig_dest = if cfg.cluster.fetch_kubeconfig {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Some(home.join(".kube").join("config"))
    } else {
        None
    };
    let opts = BootstrapOptions {
        pod_network_cidr: &cfg.kubernetes.pod_network_cidr,
        manifests: &cfg.network_plugin.manifests,
        kubeconfig_dest,
        run: AppContext::run_options(cfg, args.keep_going),
    };
    Ok(bootstrap_cluster(exec, reporter, &topology, opts).await)
}
