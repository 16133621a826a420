//! Human-readable terminal renderer.

use kubestrap_common::{HostRegistry, HostReport, HostStatus, RunReport, StepOutcome};
use owo_colors::OwoColorize as _;

use crate::domain::Role;
use crate::domain::config::TopologyConfig;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if !self.ctx.quiet {
            println!("kubestrap {version}");
        }
    }

    /// Render the registry, one host per line in execution order.
    pub fn render_hosts(&self, registry: &HostRegistry, topology: &TopologyConfig) {
        if self.ctx.quiet {
            return;
        }
        for host in registry.iter() {
            let role = Role::of(&host, topology);
            let label = match role {
                Role::ControlPlane => format!("{}", host.label.style(self.ctx.styles.bold)),
                Role::Excluded => format!("{}", host.label.style(self.ctx.styles.dim)),
                Role::Worker => host.label.clone(),
            };
            println!("  {:<16} {label} {}", host.address, format!("({})", role.as_str()).style(self.ctx.styles.dim));
        }
    }

    /// Render a per-host summary of a phase.
    pub fn render_report(&self, report: &RunReport) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header(&format!(
            "{} summary (started {})",
            report.phase,
            report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        for hr in &report.hosts {
            self.render_host(hr);
        }
        println!();
    }

    fn render_host(&self, hr: &HostReport) {
        let (mark, style) = match hr.status() {
            HostStatus::Succeeded => ("✓", self.ctx.styles.success),
            HostStatus::Failed => ("✗", self.ctx.styles.error),
            HostStatus::Incomplete | HostStatus::NotAttempted => ("-", self.ctx.styles.warning),
        };
        println!(
            "  {} {:<24} {}",
            mark.style(style),
            hr.host.to_string(),
            summary_line(hr).style(self.ctx.styles.dim)
        );
        for step in &hr.steps {
            if let StepOutcome::Failed { error } = &step.outcome {
                let first = error.lines().next().unwrap_or_default();
                println!("      {}: {first}", step.step.style(self.ctx.styles.bold));
            }
        }
    }
}

/// `"3 applied, 4 skipped"`, with failed and not-attempted counts when non-zero.
#[must_use]
pub fn summary_line(hr: &HostReport) -> String {
    let applied = hr.count(|o| *o == StepOutcome::Applied);
    let skipped = hr.count(|o| *o == StepOutcome::Skipped);
    let failed = hr.count(StepOutcome::is_failed);
    let not_attempted = hr.count(|o| *o == StepOutcome::NotAttempted);

    let mut parts = vec![format!("{applied} applied"), format!("{skipped} skipped")];
    if failed > 0 {
        parts.push(format!("{failed} failed"));
    }
    if not_attempted > 0 {
        parts.push(format!("{not_attempted} not attempted"));
    }
    parts.join(", ")
}
