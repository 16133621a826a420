//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed timeout and kill.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::application::ports::CommandRunner;

/// Default upper bound for one remote command (apt installs, `kubeadm init`).
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(900);

/// Production `CommandRunner` using tokio for async process execution
/// with guaranteed timeout and kill.
///
/// `tokio::time::timeout` around `.output().await` would drop the future
/// but leave the process running; this implementation uses `tokio::select!`
/// with an explicit `child.kill()` so the process is terminated.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn execute(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        input: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<Output> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .envs(envs.iter().copied())
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let stdin_handle = child.stdin.take();
        let input_owned = input.map(<[u8]>::to_vec);
        let stdin_task = tokio::spawn(async move {
            if let (Some(mut stdin), Some(bytes)) = (stdin_handle, input_owned) {
                let _ = stdin.write_all(&bytes).await;
            }
        });

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                let _ = stdin_task.await;
                Ok(Output {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stdout,
                    stderr,
                })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
        }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_TIMEOUT)
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        self.execute(program, args, &[], None, timeout).await
    }

    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<Output> {
        self.execute(program, args, envs, None, self.timeout).await
    }

    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        input: &[u8],
    ) -> Result<Output> {
        self.execute(program, args, envs, Some(input), self.timeout)
            .await
    }
}
