//! Value types describing a remote command and its result.

/// Exit status ssh reserves for its own connection errors.
pub const SSH_CONNECTION_ERROR: i32 = 255;

/// How a command reaches its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Public-key login, never prompting.
    Key,
    /// Password login through `sshpass`; the bootstrap credential.
    Password,
}

/// Exit code plus captured output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn new(code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The transport itself failed; the command never ran.
    #[must_use]
    pub fn unreachable(&self) -> bool {
        self.code == Some(SSH_CONNECTION_ERROR)
    }

    /// stdout followed by stderr.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            ("", err) => err.to_string(),
            (out, "") => out.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }

    #[must_use]
    pub fn code_display(&self) -> String {
        self.code
            .map_or_else(|| "signal".to_string(), |c| c.to_string())
    }
}
