//! `kubestrap trust`: passwordless SSH and sudo across every listed host.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::ssh_trust::{TrustOptions, setup_trust};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::hosts::load_registry;
use crate::infra::ssh::LocalIdentity;
use crate::output::TerminalReporter;

/// Run the trust command.
///
/// Every host in the registry takes part, including labels excluded from
/// the cluster.
///
/// # Errors
///
/// Returns an error if loading fails, the user declines, or any host fails.
pub async fn run(app: &AppContext) -> Result<()> {
    let cfg = app.load_config()?;
    let registry = load_registry(&cfg)?;
    let credentials = app.load_credentials(true)?;

    let prompt = format!(
        "Install SSH keys and passwordless sudo for '{}' on {} host(s)?",
        credentials.user,
        registry.len()
    );
    if !app.confirm(&prompt, true)? {
        anyhow::bail!("trust setup cancelled");
    }

    let user = credentials.user.clone();
    let exec = app.executor(&cfg, credentials);
    let identity = LocalIdentity::new(TokioCommandRunner::default())?;
    let reporter = TerminalReporter::new(&app.progress);
    let opts = TrustOptions {
        user: &user,
        host_key: cfg.ssh.strict_host_key_checking,
        run: AppContext::run_options(&cfg, false),
    };

    let report = setup_trust(&exec, &identity, &reporter, &registry, &opts).await?;
    drop(reporter);
    app.finish(&report)
}
