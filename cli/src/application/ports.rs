//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use kubestrap_common::Host;

use crate::domain::{ClusterConfig, CommandOutput, Transport};

// ── Config Store Port ─────────────────────────────────────────────────────────

/// Abstracts loading the cluster configuration.
pub trait ConfigStore {
    /// Load and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    fn load(&self) -> Result<ClusterConfig>;
    /// The file this store reads from.
    fn path(&self) -> PathBuf;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts local process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with extra environment variables.
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<Output>;
    /// Run a program with extra environment variables and stdin piped from `input`.
    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        input: &[u8],
    ) -> Result<Output>;
}

// ── Remote Execution Port ─────────────────────────────────────────────────────

/// Runs commands on cluster hosts.
///
/// A non-zero remote exit status is returned as `Ok` with the status in
/// [`CommandOutput::code`]; `Err` is reserved for failures to run the
/// transport at all (spawn failure, timeout).
#[allow(async_fn_in_trait)]
pub trait RemoteExecutor {
    /// Run a shell command on `host`.
    async fn exec(&self, host: &Host, transport: Transport, command: &str)
    -> Result<CommandOutput>;
    /// Run a shell command on `host` with the login password on its stdin.
    async fn exec_with_password(
        &self,
        host: &Host,
        transport: Transport,
        command: &str,
    ) -> Result<CommandOutput>;
    /// Copy a local file to `remote` on `host`.
    async fn upload(
        &self,
        host: &Host,
        transport: Transport,
        local: &str,
        remote: &str,
    ) -> Result<CommandOutput>;
    /// Copy `remote` on `host` to a local path, creating parent directories.
    async fn download(
        &self,
        host: &Host,
        transport: Transport,
        remote: &str,
        local: &Path,
    ) -> Result<CommandOutput>;
    /// Install this machine's public key on `host` using password login.
    async fn copy_local_key(&self, host: &Host) -> Result<CommandOutput>;
}

// ── SSH Identity Port ─────────────────────────────────────────────────────────

/// Abstracts the local SSH identity used for key logins.
#[allow(async_fn_in_trait)]
pub trait SshIdentity {
    /// Ensure the local private key exists, generating it when missing.
    ///
    /// Returns `true` when a new key was generated.
    async fn ensure_identity(&self) -> Result<bool>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
