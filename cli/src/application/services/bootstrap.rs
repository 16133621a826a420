//! Application service: cluster bootstrap use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use kubestrap_common::{Host, RunReport, StepOutcome};

use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::application::services::runner::{PhaseRunner, RunOptions, run_step};
use crate::domain::{
    JoinCommand, ProvisionError, Topology, Transport, UnreachablePolicy,
    plan::{self, PRINT_JOIN_COMMAND},
};

const INIT_STEP: &str = "control-plane init";
const JOIN_STEP: &str = "join cluster";

/// Settings for [`bootstrap_cluster`].
pub struct BootstrapOptions<'a> {
    pub pod_network_cidr: &'a str,
    pub manifests: &'a [String],
    /// Where to store the admin kubeconfig locally; `None` skips the copy.
    pub kubeconfig_dest: Option<PathBuf>,
    pub run: RunOptions,
}

/// Initialize the control plane, join the workers, install the network plugin.
pub async fn bootstrap_cluster(
    exec: &impl RemoteExecutor,
    reporter: &impl ProgressReporter,
    topology: &Topology,
    opts: BootstrapOptions<'_>,
) -> RunReport {
    let cp = &topology.control_plane;
    let mut runner = PhaseRunner::new(exec, reporter, opts.run, "bootstrap");

    reporter.step(&format!("initializing control plane on {cp}"));
    let join = match init_control_plane(
        exec,
        reporter,
        cp,
        opts.pod_network_cidr,
        opts.run.on_unreachable,
    )
    .await
    {
        Ok(join) => {
            let outcome = if join.is_empty() {
                StepOutcome::Skipped
            } else {
                StepOutcome::Applied
            };
            runner.record(cp, INIT_STEP, outcome);
            Some(join)
        }
        Err(e) => {
            runner.fail(cp, INIT_STEP, &e);
            None
        }
    };

    match join {
        None => {
            for worker in &topology.workers {
                runner.record(worker, JOIN_STEP, StepOutcome::NotAttempted);
            }
        }
        Some(join) if join.is_empty() => {
            reporter.success("worker nodes already joined, skipping");
            for worker in &topology.workers {
                runner.record(worker, JOIN_STEP, StepOutcome::Skipped);
            }
        }
        Some(join) => {
            let step = plan::worker_join(&join);
            for worker in &topology.workers {
                runner.run_one_outcome(worker, &step).await;
            }
        }
    }

    if let Some(dest) = opts.kubeconfig_dest {
        runner
            .run_one_outcome(cp, &plan::fetch_kubeconfig(dest))
            .await;
    }
    runner
        .run_one_outcome(cp, &plan::network_plugin(opts.manifests))
        .await;

    runner.finish()
}

/// Run `kubeadm init` unless the API server manifest already exists.
///
/// Returns the worker join command, or an empty one when the control plane
/// was already initialized.
///
/// # Errors
///
/// Returns an error if init fails or no join command can be obtained.
pub async fn init_control_plane(
    exec: &impl RemoteExecutor,
    reporter: &impl ProgressReporter,
    control_plane: &Host,
    pod_network_cidr: &str,
    on_unreachable: UnreachablePolicy,
) -> Result<JoinCommand> {
    let step = plan::control_plane_init(pod_network_cidr);
    match run_step(exec, reporter, control_plane, &step, on_unreachable).await {
        StepOutcome::Skipped => return Ok(JoinCommand::empty()),
        StepOutcome::Failed { error } => return Err(anyhow!(error)),
        StepOutcome::Applied | StepOutcome::NotAttempted => {}
    }

    let output = exec
        .exec(control_plane, Transport::Key, PRINT_JOIN_COMMAND)
        .await
        .with_context(|| format!("creating join token on {control_plane}"))?;
    if !output.success() {
        return Err(ProvisionError::CommandFailed {
            host: control_plane.to_string(),
            step: "join token".to_string(),
            code: output.code_display(),
            output: output.combined(),
        }
        .into());
    }
    JoinCommand::extract(&output.stdout)
}
