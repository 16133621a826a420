//! Shared mock infrastructure for unit tests.
//!
//! `ScriptedExecutor` answers every remote call from a list of prefix rules
//! and records what was asked of it; `RecordingReporter` and `FakeIdentity`
//! stand in for the terminal and the local key.

#![allow(clippy::expect_used, dead_code)]

use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use kubestrap_cli::application::ports::{
    CommandRunner, ProgressReporter, RemoteExecutor, SshIdentity,
};
use kubestrap_cli::domain::{CommandOutput, Transport};
use kubestrap_common::{Host, HostRegistry};

// ── Output helpers ────────────────────────────────────────────────────────────

pub fn ok() -> CommandOutput {
    CommandOutput::new(Some(0), "", "")
}

pub fn ok_stdout(stdout: &str) -> CommandOutput {
    CommandOutput::new(Some(0), stdout, "")
}

pub fn exit(code: i32) -> CommandOutput {
    CommandOutput::new(Some(code), "", "")
}

pub fn unreachable() -> CommandOutput {
    CommandOutput::new(Some(255), "", "ssh: connect to host port 22: No route to host")
}

pub fn registry(pairs: &[(&str, &str)]) -> HostRegistry {
    HostRegistry::from_pairs(pairs.iter().copied())
}

// ── Recording executor ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Exec,
    ExecWithPassword,
    Upload,
    Download,
    CopyLocalKey,
}

/// One call made against the executor.
#[derive(Debug, Clone)]
pub struct Call {
    /// Label of the host the call ran on.
    pub host: String,
    pub kind: CallKind,
    pub transport: Transport,
    /// Shell command, or the remote path for file transfers.
    pub command: String,
}

struct Rule {
    host: Option<String>,
    prefix: String,
    output: CommandOutput,
}

/// Executor answering from prefix rules; the first matching rule wins and
/// anything unmatched exits 0 with no output.
#[derive(Default)]
pub struct ScriptedExecutor {
    rules: Vec<Rule>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` on any host.
    #[must_use]
    pub fn when(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.rules.push(Rule {
            host: None,
            prefix: prefix.to_string(),
            output,
        });
        self
    }

    /// Answer commands starting with `prefix` on the host labelled `label`.
    #[must_use]
    pub fn when_on(mut self, label: &str, prefix: &str, output: CommandOutput) -> Self {
        self.rules.push(Rule {
            host: Some(label.to_string()),
            prefix: prefix.to_string(),
            output,
        });
        self
    }

    /// Every node-provisioning probe reports the step as not yet done.
    #[must_use]
    pub fn node_probes_absent(self) -> Self {
        self.when("test -f", exit(1))
            .when("sysctl -n", ok_stdout("0\n"))
            .when("grep -Fqs", exit(1))
            .when("dpkg -s", exit(1))
            .when("grep -q 'SystemdCgroup", exit(1))
    }

    /// Every trust probe reports the step as not yet done.
    #[must_use]
    pub fn trust_probes_absent(self) -> Self {
        self.when("test -f \"$HOME/.ssh/id_rsa\"", exit(1))
            .when("sudo -n true", exit(1))
            .when("command -v sshpass", exit(1))
            .when("grep -Fxq", exit(1))
            .when("ssh -o BatchMode=yes", exit(1))
            .when("true", unreachable())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    /// Labels of hosts in the order they were first contacted.
    pub fn host_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        for call in self.calls() {
            if order.last() != Some(&call.host) {
                order.push(call.host);
            }
        }
        order
    }

    pub fn commands_on(&self, label: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.host == label)
            .map(|c| c.command)
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn respond(
        &self,
        host: &Host,
        kind: CallKind,
        transport: Transport,
        command: &str,
    ) -> CommandOutput {
        self.calls.lock().expect("lock").push(Call {
            host: host.label.clone(),
            kind,
            transport,
            command: command.to_string(),
        });
        self.rules
            .iter()
            .find(|r| {
                r.host.as_deref().is_none_or(|h| h == host.label)
                    && command.starts_with(&r.prefix)
            })
            .map_or_else(ok, |r| r.output.clone())
    }
}

impl RemoteExecutor for ScriptedExecutor {
    async fn exec(&self, host: &Host, transport: Transport, command: &str) -> Result<CommandOutput> {
        Ok(self.respond(host, CallKind::Exec, transport, command))
    }

    async fn exec_with_password(
        &self,
        host: &Host,
        transport: Transport,
        command: &str,
    ) -> Result<CommandOutput> {
        Ok(self.respond(host, CallKind::ExecWithPassword, transport, command))
    }

    async fn upload(
        &self,
        host: &Host,
        transport: Transport,
        _local: &str,
        remote: &str,
    ) -> Result<CommandOutput> {
        Ok(self.respond(host, CallKind::Upload, transport, remote))
    }

    async fn download(
        &self,
        host: &Host,
        transport: Transport,
        remote: &str,
        _local: &Path,
    ) -> Result<CommandOutput> {
        Ok(self.respond(host, CallKind::Download, transport, remote))
    }

    async fn copy_local_key(&self, host: &Host) -> Result<CommandOutput> {
        Ok(self.respond(host, CallKind::CopyLocalKey, Transport::Password, "ssh-copy-id"))
    }
}

// ── Reporter ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("lock").clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.messages.lock().expect("lock").push(format!("step: {message}"));
    }
    fn success(&self, message: &str) {
        self.messages.lock().expect("lock").push(format!("ok: {message}"));
    }
    fn warn(&self, message: &str) {
        self.messages.lock().expect("lock").push(format!("warn: {message}"));
    }
}

// ── Identity ──────────────────────────────────────────────────────────────────

/// Local key that either exists, is generated on demand, or cannot be made.
pub enum FakeIdentity {
    Present,
    Missing,
    Broken,
}

impl SshIdentity for FakeIdentity {
    async fn ensure_identity(&self) -> Result<bool> {
        match self {
            Self::Present => Ok(false),
            Self::Missing => Ok(true),
            Self::Broken => anyhow::bail!("ssh-keygen failed: permission denied"),
        }
    }
}

// ── Command runner ────────────────────────────────────────────────────────────

/// One local process invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub stdin: Option<Vec<u8>>,
}

/// `CommandRunner` that records invocations and exits with a fixed code.
#[derive(Default)]
pub struct RecordingRunner {
    pub code: i32,
    invocations: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
    /// Runner whose every invocation exits with `code`.
    pub fn with_code(code: i32) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().expect("lock").clone()
    }

    pub fn last(&self) -> Invocation {
        self.invocations().pop().expect("an invocation")
    }

    fn record(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        stdin: Option<&[u8]>,
    ) -> std::process::Output {
        self.invocations.lock().expect("lock").push(Invocation {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            envs: envs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            stdin: stdin.map(<[u8]>::to_vec),
        });
        output(self.code)
    }
}

#[cfg(unix)]
pub fn output(code: i32) -> std::process::Output {
    use std::os::unix::process::ExitStatusExt;
    std::process::Output {
        status: std::process::ExitStatus::from_raw(code << 8),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<std::process::Output> {
        Ok(self.record(program, args, &[], None))
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        _timeout: std::time::Duration,
    ) -> Result<std::process::Output> {
        Ok(self.record(program, args, &[], None))
    }

    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<std::process::Output> {
        Ok(self.record(program, args, envs, None))
    }

    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        input: &[u8],
    ) -> Result<std::process::Output> {
        Ok(self.record(program, args, envs, Some(input)))
    }
}
