//! `kubestrap hosts`: print the host registry in execution order.

use anyhow::Result;

use crate::app::AppContext;
use crate::infra::hosts::load_registry;

/// Run the hosts command.
///
/// # Errors
///
/// Returns an error if the configuration or the hosts file cannot be loaded.
pub fn run(app: &AppContext) -> Result<()> {
    let cfg = app.load_config()?;
    let registry = load_registry(&cfg)?;
    app.renderer().render_hosts(&registry, &cfg.cluster)
}
