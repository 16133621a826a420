//! Application service: passwordless SSH trust use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use anyhow::{Context, Result};
use kubestrap_common::{HostRegistry, RunReport};

use crate::application::ports::{ProgressReporter, RemoteExecutor, SshIdentity};
use crate::application::services::runner::{PhaseRunner, RunOptions};
use crate::domain::{HostKeyPolicy, Step, plan};

/// Settings for [`setup_trust`].
pub struct TrustOptions<'a> {
    /// Login user on every host.
    pub user: &'a str,
    pub host_key: HostKeyPolicy,
    pub run: RunOptions,
}

/// Build passwordless SSH trust between this machine and every host, and
/// between every ordered pair of distinct hosts.
///
/// Phases run over all hosts before the next phase starts: remote key
/// generation, passwordless sudo, `sshpass`, `/etc/hosts`, then trust.
///
/// # Errors
///
/// Returns an error only when the local SSH key cannot be generated;
/// per-host failures are recorded in the returned report.
pub async fn setup_trust(
    exec: &impl RemoteExecutor,
    identity: &impl SshIdentity,
    reporter: &impl ProgressReporter,
    registry: &HostRegistry,
    opts: &TrustOptions<'_>,
) -> Result<RunReport> {
    reporter.step("checking local SSH key...");
    if identity
        .ensure_identity()
        .await
        .context("generating local SSH key")?
    {
        reporter.success("generated local SSH key");
    } else {
        reporter.success("local SSH key already exists, skipping");
    }

    let mut runner = PhaseRunner::new(exec, reporter, opts.run, "trust");
    let per_host: [Step; 4] = [
        plan::remote_key(),
        plan::passwordless_sudo(opts.user),
        plan::sshpass_installed(),
        plan::hosts_file(registry),
    ];
    for step in &per_host {
        for host in registry.iter() {
            runner.run_one_outcome(&host, step).await;
        }
    }

    for host in registry.iter() {
        if !runner.halted(&host) {
            reporter.step(&format!("setting up passwordless SSH on {host}"));
        }
        let mut steps = vec![plan::local_trust()];
        steps.extend(
            registry
                .iter()
                .filter(|peer| peer.address != host.address)
                .map(|peer| plan::peer_trust(opts.user, &peer, opts.host_key)),
        );
        runner.run_host(&host, &steps).await;
    }

    Ok(runner.finish())
}
