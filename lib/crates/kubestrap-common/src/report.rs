//! Run report types: per-step outcomes aggregated per host, and per run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hosts::Host;

/// What happened to a single provisioning step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The mutating command ran and succeeded.
    Applied,
    /// The idempotency probe reported the step as already done.
    Skipped,
    /// The step failed; later steps on this host did not run.
    Failed { error: String },
    /// An earlier failure stopped the run before this step.
    NotAttempted,
}

impl StepOutcome {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Overall state of one host after a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    Succeeded,
    Failed,
    /// Some steps ran, then the run was aborted by a failure elsewhere.
    Incomplete,
    /// The run was aborted before this host was reached.
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostReport {
    pub host: Host,
    pub steps: Vec<StepReport>,
}

impl HostReport {
    #[must_use]
    pub fn new(host: Host) -> Self {
        Self {
            host,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, step: impl Into<String>, outcome: StepOutcome) {
        self.steps.push(StepReport {
            step: step.into(),
            outcome,
        });
    }

    #[must_use]
    pub fn status(&self) -> HostStatus {
        let not_attempted = self.count(|o| *o == StepOutcome::NotAttempted);
        if self.steps.iter().any(|s| s.outcome.is_failed()) {
            HostStatus::Failed
        } else if not_attempted == self.steps.len() {
            HostStatus::NotAttempted
        } else if not_attempted > 0 {
            HostStatus::Incomplete
        } else {
            HostStatus::Succeeded
        }
    }

    #[must_use]
    pub fn failed(&self) -> bool {
        self.status() == HostStatus::Failed
    }

    #[must_use]
    pub fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| pred(&s.outcome)).count()
    }
}

/// Summary of one phase (`trust`, `provision`, `bootstrap`) over all hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub phase: String,
    pub started_at: DateTime<Utc>,
    pub hosts: Vec<HostReport>,
}

impl RunReport {
    #[must_use]
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            started_at: Utc::now(),
            hosts: Vec::new(),
        }
    }

    /// Report for `host`, created on first use.
    pub fn host_mut(&mut self, host: &Host) -> &mut HostReport {
        if let Some(idx) = self.hosts.iter().position(|r| r.host == *host) {
            return &mut self.hosts[idx];
        }
        self.hosts.push(HostReport::new(host.clone()));
        let last = self.hosts.len() - 1;
        &mut self.hosts[last]
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.hosts.iter().any(HostReport::failed)
    }

    #[must_use]
    pub fn failed_hosts(&self) -> Vec<&Host> {
        self.hosts
            .iter()
            .filter(|r| r.failed())
            .map(|r| &r.host)
            .collect()
    }

    /// Fold another phase's hosts into this report, keeping per-host order.
    pub fn absorb(&mut self, other: RunReport) {
        for hr in other.hosts {
            let target = self.host_mut(&hr.host);
            target.steps.extend(hr.steps);
        }
    }
}
