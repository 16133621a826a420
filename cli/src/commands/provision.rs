//! `kubestrap provision`: prepare every cluster node for kubeadm.

use anyhow::Result;
use kubestrap_common::RunReport;

use crate::app::AppContext;
use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::application::services::provision::provision_nodes;
use crate::commands::RunArgs;
use crate::domain::{ClusterConfig, cluster_nodes};
use crate::infra::hosts::load_registry;
use crate::output::TerminalReporter;

/// Run the provision command.
///
/// # Errors
///
/// Returns an error if loading fails or any node fails to provision.
pub async fn run(app: &AppContext, args: &RunArgs) -> Result<()> {
    let cfg = app.load_config()?;
    let exec = app.executor(&cfg, app.load_credentials(false)?);
    let reporter = TerminalReporter::new(&app.progress);
    let report = provision(&exec, &reporter, &cfg, args).await?;
    drop(reporter);
    app.finish(&report)
}

/// Provision the cluster nodes and return the report without rendering it.
pub(crate) async fn provision(
    exec: &impl RemoteExecutor,
    reporter: &impl ProgressReporter,
    cfg: &ClusterConfig,
    args: &RunArgs,
) -> Result<RunReport> {
    let nodes = cluster_nodes(&load_registry(cfg)?, &cfg.cluster);
    let opts = AppContext::run_options(cfg, args.keep_going);
    Ok(provision_nodes(exec, reporter, &nodes, cfg, opts).await)
}
