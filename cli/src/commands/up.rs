//! `kubestrap up`: provision every node, then bootstrap the cluster.

use anyhow::Result;

use crate::app::AppContext;
use crate::commands::RunArgs;
use crate::commands::{bootstrap, provision};
use crate::output::TerminalReporter;

/// Run the up command.
///
/// Bootstrap only starts when provisioning reported no failure. Both
/// phases are rendered as a single report.
///
/// # Errors
///
/// Returns an error if loading fails or any host fails in either phase.
pub async fn run(app: &AppContext, args: &RunArgs) -> Result<()> {
    let cfg = app.load_config()?;
    let exec = app.executor(&cfg, app.load_credentials(false)?);
    let reporter = TerminalReporter::new(&app.progress);

    let mut report = provision::provision(&exec, &reporter, &cfg, args).await?;
    if !report.has_failures() {
        report.absorb(bootstrap::bootstrap(&exec, &reporter, &cfg, args).await?);
    }
    report.phase = "up".to_string();
    drop(reporter);
    app.finish(&report)
}
