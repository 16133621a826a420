//! Step execution: probe, then run, recording one outcome per step.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use kubestrap_common::{Host, RunReport, StepOutcome};

use crate::application::ports::{ProgressReporter, RemoteExecutor};
use crate::domain::{
    CommandOutput, FailurePolicy, Op, ProbeVerdict, ProvisionError, Step, UnreachablePolicy,
};

/// Policies shared by every phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub on_unreachable: UnreachablePolicy,
    pub on_failure: FailurePolicy,
}

/// Run one step on one host.
///
/// A satisfied probe skips the step. Every op must exit 0; the first one
/// that doesn't fails the step and the rest are not run.
pub async fn run_step(
    exec: &impl RemoteExecutor,
    reporter: &impl ProgressReporter,
    host: &Host,
    step: &Step,
    on_unreachable: UnreachablePolicy,
) -> StepOutcome {
    match try_step(exec, reporter, host, step, on_unreachable).await {
        Ok(true) => StepOutcome::Applied,
        Ok(false) => StepOutcome::Skipped,
        Err(e) => StepOutcome::Failed {
            error: format!("{e:#}"),
        },
    }
}

async fn try_step(
    exec: &impl RemoteExecutor,
    reporter: &impl ProgressReporter,
    host: &Host,
    step: &Step,
    on_unreachable: UnreachablePolicy,
) -> Result<bool> {
    if let Some(probe) = &step.probe {
        let verdict = match exec.exec(host, step.transport, &probe.command).await {
            Ok(output) => probe.evaluate(&output),
            Err(_) => ProbeVerdict::Unreachable,
        };
        match verdict {
            ProbeVerdict::Satisfied => {
                reporter.success(&format!(
                    "{}: {} already configured, skipping",
                    host.label, step.name
                ));
                return Ok(false);
            }
            ProbeVerdict::Absent => {}
            ProbeVerdict::Unreachable => {
                reporter.warn(&format!(
                    "{}: could not check {} (host unreachable)",
                    host.label, step.name
                ));
                if on_unreachable == UnreachablePolicy::Fail {
                    return Err(ProvisionError::ProbeUnreachable {
                        host: host.to_string(),
                        step: step.name.clone(),
                    }
                    .into());
                }
            }
        }
    }

    reporter.step(&format!("{}: {}...", host.label, step.name));
    for op in &step.ops {
        let output = run_op(exec, host, step, op)
            .await
            .with_context(|| format!("'{}' on {host}", step.name))?;
        if !output.success() {
            return Err(ProvisionError::CommandFailed {
                host: host.to_string(),
                step: step.name.clone(),
                code: output.code_display(),
                output: output.combined(),
            }
            .into());
        }
    }
    reporter.success(&format!("{}: {}", host.label, step.name));
    Ok(true)
}

async fn run_op(
    exec: &impl RemoteExecutor,
    host: &Host,
    step: &Step,
    op: &Op,
) -> Result<CommandOutput> {
    match op {
        Op::Run(command) => exec.exec(host, step.transport, command).await,
        Op::RunWithPassword(command) => {
            exec.exec_with_password(host, step.transport, command).await
        }
        Op::Upload { local, remote } => exec.upload(host, step.transport, local, remote).await,
        Op::Download { remote, local } => {
            exec.download(host, step.transport, remote, local).await
        }
        Op::CopyLocalKey => exec.copy_local_key(host).await,
    }
}

// ── Phase runner ──────────────────────────────────────────────────────────────

/// Drives step lists over hosts and accumulates a [`RunReport`].
///
/// Once a step fails, the failing host runs nothing further. Under
/// [`FailurePolicy::Abort`] no other host runs anything further either;
/// skipped work is recorded as [`StepOutcome::NotAttempted`].
pub struct PhaseRunner<'a, E, P> {
    exec: &'a E,
    reporter: &'a P,
    opts: RunOptions,
    report: RunReport,
    failed: BTreeSet<String>,
    aborted: bool,
}

impl<'a, E: RemoteExecutor, P: ProgressReporter> PhaseRunner<'a, E, P> {
    pub fn new(exec: &'a E, reporter: &'a P, opts: RunOptions, phase: &str) -> Self {
        Self {
            exec,
            reporter,
            opts,
            report: RunReport::new(phase),
            failed: BTreeSet::new(),
            aborted: false,
        }
    }

    /// `true` once nothing more may run on `host`.
    #[must_use]
    pub fn halted(&self, host: &Host) -> bool {
        self.aborted || self.failed.contains(&host.address)
    }

    /// Run `steps` on `host` in order.
    ///
    /// Returns `true` when every step was applied or skipped.
    pub async fn run_host(&mut self, host: &Host, steps: &[Step]) -> bool {
        for step in steps {
            self.run_one_outcome(host, step).await;
        }
        !self.halted(host)
    }

    /// Run a single step, returning the outcome on success.
    pub async fn run_one_outcome(&mut self, host: &Host, step: &Step) -> Option<StepOutcome> {
        if self.halted(host) {
            self.report
                .host_mut(host)
                .record(step.name.clone(), StepOutcome::NotAttempted);
            return None;
        }
        let outcome = run_step(
            self.exec,
            self.reporter,
            host,
            step,
            self.opts.on_unreachable,
        )
        .await;
        if let StepOutcome::Failed { error } = &outcome {
            self.reporter
                .warn(&format!("{}: {} failed: {error}", host.label, step.name));
            self.failed.insert(host.address.clone());
            if self.opts.on_failure == FailurePolicy::Abort {
                self.aborted = true;
            }
        }
        self.report
            .host_mut(host)
            .record(step.name.clone(), outcome.clone());
        (!outcome.is_failed()).then_some(outcome)
    }

    /// Record an outcome decided outside [`run_step`].
    pub fn record(&mut self, host: &Host, name: &str, outcome: StepOutcome) {
        self.report.host_mut(host).record(name, outcome);
    }

    /// Record a failure that happened outside a step.
    pub fn fail(&mut self, host: &Host, name: &str, error: &anyhow::Error) {
        self.report.host_mut(host).record(
            name,
            StepOutcome::Failed {
                error: format!("{error:#}"),
            },
        );
        self.reporter
            .warn(&format!("{}: {name} failed: {error:#}", host.label));
        self.failed.insert(host.address.clone());
        if self.opts.on_failure == FailurePolicy::Abort {
            self.aborted = true;
        }
    }

    #[must_use]
    pub fn finish(self) -> RunReport {
        self.report
    }
}
