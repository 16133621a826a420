//! Idempotency probes: read-only checks deciding whether a step is needed.

use crate::domain::remote::CommandOutput;

/// How the probe's result is judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeCheck {
    /// Satisfied iff the command exits 0.
    ExitCode,
    /// Satisfied iff trimmed stdout equals the value.
    OutputEquals(String),
    /// Satisfied iff combined output contains the literal marker.
    ///
    /// Formatting changes in the remote tool break this silently; prefer
    /// `ExitCode` wherever the tool reports state through its status.
    Marker(String),
    /// Satisfied iff key login succeeds. A refused login also exits 255,
    /// so exit 255 is read as absent rather than unreachable.
    Login,
}

/// A read-only remote command plus its success criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub command: String,
    pub check: ProbeCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// Already in the desired state: skip the step.
    Satisfied,
    /// Not yet configured: run the step.
    Absent,
    /// The host could not be reached, so the state is unknown.
    Unreachable,
}

impl Probe {
    pub fn exit_code(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            check: ProbeCheck::ExitCode,
        }
    }

    pub fn output_equals(command: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            check: ProbeCheck::OutputEquals(expected.into()),
        }
    }

    pub fn marker(command: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            check: ProbeCheck::Marker(marker.into()),
        }
    }

    pub fn login(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            check: ProbeCheck::Login,
        }
    }

    /// Judge a finished probe command.
    #[must_use]
    pub fn evaluate(&self, output: &CommandOutput) -> ProbeVerdict {
        if output.unreachable() && self.check != ProbeCheck::Login {
            return ProbeVerdict::Unreachable;
        }
        let satisfied = match &self.check {
            ProbeCheck::ExitCode | ProbeCheck::Login => output.success(),
            ProbeCheck::OutputEquals(expected) => output.stdout.trim() == expected,
            ProbeCheck::Marker(marker) => output.combined().contains(marker.as_str()),
        };
        if satisfied {
            ProbeVerdict::Satisfied
        } else {
            ProbeVerdict::Absent
        }
    }
}
