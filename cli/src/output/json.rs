//! JSON output helpers.
//!
//! Provides the error-object formatter used by all `--json` code paths when
//! a command fails, and the `--json` renderer for successful output.

use anyhow::{Context, Result};
use kubestrap_common::{HostRegistry, RunReport};

use crate::domain::{ConfigError, CredentialError, ProvisionError, Role};
use crate::domain::config::TopologyConfig;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// `true` when `err` is a phase failure whose report already went to stdout.
#[must_use]
pub fn already_reported(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ProvisionError>(),
        Some(ProvisionError::RunFailed { .. })
    )
}

/// Machine-readable `code` for a failed command.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if err.downcast_ref::<CredentialError>().is_some() {
        "credentials"
    } else if err.downcast_ref::<ConfigError>().is_some() {
        "config"
    } else if err.downcast_ref::<ProvisionError>().is_some() {
        "provision"
    } else {
        "error"
    }
}

/// Renders results as pretty-printed JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// Render a run report, adding each host's overall status.
    ///
    /// A failed run also carries the `error`, `message` and `code` keys of
    /// [`format_error`], so stdout holds a single document.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_report(&self, report: &RunReport) -> Result<()> {
        println!("{}", report_json(report)?);
        Ok(())
    }

    /// Render the registry as an ordered list of `{address, label, role}`.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_hosts(&self, registry: &HostRegistry, topology: &TopologyConfig) -> Result<()> {
        println!("{}", hosts_json(registry, topology)?);
        Ok(())
    }

    /// Render `{"version": ...}`.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        let obj = serde_json::json!({ "version": version });
        println!(
            "{}",
            serde_json::to_string_pretty(&obj).context("JSON serialization failed")?
        );
        Ok(())
    }
}

pub(crate) fn report_json(report: &RunReport) -> Result<String> {
    let hosts: Vec<_> = report
        .hosts
        .iter()
        .map(|hr| {
            serde_json::json!({
                "address": hr.host.address,
                "label": hr.host.label,
                "status": hr.status(),
                "steps": hr.steps,
            })
        })
        .collect();
    let mut obj = serde_json::json!({
        "phase": report.phase,
        "started_at": report.started_at,
        "success": !report.has_failures(),
        "hosts": hosts,
    });
    if let Some(err) = ProvisionError::run_failed(report) {
        obj["error"] = serde_json::Value::Bool(true);
        let err = anyhow::Error::from(err);
        obj["message"] = serde_json::Value::String(err.to_string());
        obj["code"] = serde_json::Value::String(error_code(&err).to_string());
    }
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

pub(crate) fn hosts_json(registry: &HostRegistry, topology: &TopologyConfig) -> Result<String> {
    let hosts: Vec<_> = registry
        .iter()
        .map(|h| {
            let role = Role::of(&h, topology);
            serde_json::json!({ "address": h.address, "label": h.label, "role": role })
        })
        .collect();
    serde_json::to_string_pretty(&serde_json::json!({ "hosts": hosts }))
        .context("JSON serialization failed")
}
