//! Infrastructure SSH transport: `ssh`, `scp`, `sshpass` and `ssh-copy-id`
//! driven through a `CommandRunner`.
//!
//! `SshExecutor<R>` implements the `RemoteExecutor` port; `LocalIdentity<R>`
//! implements `SshIdentity` for the key under `~/.ssh`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};
use kubestrap_common::Host;

use crate::application::ports::{CommandRunner, RemoteExecutor, SshIdentity};
use crate::domain::{CommandOutput, Credentials, HostKeyPolicy, ProvisionError, Transport};

const SSHPASS_ENV: &str = "SSHPASS";

/// Connection options shared by `ssh` and `scp`.
#[derive(Debug, Clone)]
pub struct SshOptions {
    pub host_key: HostKeyPolicy,
    pub connect_timeout: Duration,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            host_key: HostKeyPolicy::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Runs remote commands through the local OpenSSH client.
///
/// Generic over `R: CommandRunner` so that tests can inject a mock runner
/// without spawning real processes.
pub struct SshExecutor<R: CommandRunner> {
    runner: R,
    credentials: Credentials,
    options: SshOptions,
}

impl<R: CommandRunner> SshExecutor<R> {
    pub fn new(runner: R, credentials: Credentials, options: SshOptions) -> Self {
        Self {
            runner,
            credentials,
            options,
        }
    }

    /// The underlying runner (for tests).
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn target(&self, host: &Host) -> String {
        format!("{}@{}", self.credentials.user, host.address)
    }

    /// `-o` options common to ssh, scp and ssh-copy-id.
    fn common_opts(&self, transport: Transport) -> Vec<String> {
        let mut opts = vec![
            "-o".to_string(),
            format!(
                "StrictHostKeyChecking={}",
                self.options.host_key.as_ssh_value()
            ),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.options.connect_timeout.as_secs()),
        ];
        if transport == Transport::Key {
            opts.extend(["-o".to_string(), "BatchMode=yes".to_string()]);
        }
        opts
    }

    fn password(&self) -> Result<&str> {
        self.credentials
            .password()
            .ok_or_else(|| ProvisionError::PasswordUnavailable.into())
    }

    /// Prefix `tool` with `sshpass -e` for password transport.
    fn program(&self, transport: Transport, tool: &str) -> Result<(String, Vec<String>)> {
        match transport {
            Transport::Key => Ok((tool.to_string(), Vec::new())),
            Transport::Password => {
                self.password()?;
                Ok(("sshpass".to_string(), vec!["-e".to_string(), tool.to_string()]))
            }
        }
    }

    fn envs(&self, transport: Transport) -> Vec<(&str, &str)> {
        match (transport, self.credentials.password()) {
            (Transport::Password, Some(pw)) => vec![(SSHPASS_ENV, pw)],
            _ => Vec::new(),
        }
    }

    fn ssh_argv(&self, host: &Host, transport: Transport, command: &str) -> Result<(String, Vec<String>)> {
        let (program, mut args) = self.program(transport, "ssh")?;
        args.extend(self.common_opts(transport));
        args.push(self.target(host));
        args.push(command.to_string());
        Ok((program, args))
    }

    async fn scp(&self, transport: Transport, from: &str, to: &str) -> Result<CommandOutput> {
        let (program, mut args) = self.program(transport, "scp")?;
        args.extend(self.common_opts(transport));
        args.push(from.to_string());
        args.push(to.to_string());
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner
            .run_with_env(&program, &argv, &self.envs(transport))
            .await
            .map(into_command_output)
            .context("scp")
    }
}

impl<R: CommandRunner> RemoteExecutor for SshExecutor<R> {
    async fn exec(
        &self,
        host: &Host,
        transport: Transport,
        command: &str,
    ) -> Result<CommandOutput> {
        let (program, args) = self.ssh_argv(host, transport, command)?;
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner
            .run_with_env(&program, &argv, &self.envs(transport))
            .await
            .map(into_command_output)
            .with_context(|| format!("ssh {}", self.target(host)))
    }

    async fn exec_with_password(
        &self,
        host: &Host,
        transport: Transport,
        command: &str,
    ) -> Result<CommandOutput> {
        let input = format!("{}\n", self.password()?);
        let (program, args) = self.ssh_argv(host, transport, command)?;
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner
            .run_with_stdin(&program, &argv, &self.envs(transport), input.as_bytes())
            .await
            .map(into_command_output)
            .with_context(|| format!("ssh {}", self.target(host)))
    }

    async fn upload(
        &self,
        host: &Host,
        transport: Transport,
        local: &str,
        remote: &str,
    ) -> Result<CommandOutput> {
        let to = format!("{}:{remote}", self.target(host));
        self.scp(transport, local, &to).await
    }

    async fn download(
        &self,
        host: &Host,
        transport: Transport,
        remote: &str,
        local: &Path,
    ) -> Result<CommandOutput> {
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let from = format!("{}:{remote}", self.target(host));
        self.scp(transport, &from, &local.to_string_lossy()).await
    }

    async fn copy_local_key(&self, host: &Host) -> Result<CommandOutput> {
        let (program, mut args) = self.program(Transport::Password, "ssh-copy-id")?;
        args.extend(self.common_opts(Transport::Password));
        args.push(self.target(host));
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner
            .run_with_env(&program, &argv, &self.envs(Transport::Password))
            .await
            .map(into_command_output)
            .context("ssh-copy-id")
    }
}

fn into_command_output(output: Output) -> CommandOutput {
    CommandOutput::new(
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    )
}

// ── Local identity ────────────────────────────────────────────────────────────

/// The RSA key pair this machine uses for key logins.
pub struct LocalIdentity<R: CommandRunner> {
    runner: R,
    key_path: PathBuf,
}

impl<R: CommandRunner> LocalIdentity<R> {
    /// Identity at `~/.ssh/id_rsa`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new(runner: R) -> Result<Self> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_path(runner, home.join(".ssh").join("id_rsa")))
    }

    /// Identity at an arbitrary path (for testing).
    pub fn with_path(runner: R, key_path: PathBuf) -> Self {
        Self { runner, key_path }
    }
}

impl<R: CommandRunner> SshIdentity for LocalIdentity<R> {
    async fn ensure_identity(&self) -> Result<bool> {
        if self.key_path.exists() {
            return Ok(false);
        }
        if let Some(dir) = self.key_path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }
        let path = self.key_path.to_string_lossy();
        let output = self
            .runner
            .run(
                "ssh-keygen",
                &["-t", "rsa", "-b", "4096", "-N", "", "-f", &path, "-q"],
            )
            .await?;
        anyhow::ensure!(
            output.status.success(),
            "ssh-keygen failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(true)
    }
}
