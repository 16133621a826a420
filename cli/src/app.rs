//! Application context: unified state passed to every command handler.
//!
//! `AppContext` bundles the output context, the configuration store, and the
//! credential source so that adding a cross-cutting concern requires only one
//! field change here and zero command signature changes.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use kubestrap_common::RunReport;

use crate::application::ports::ConfigStore;
use crate::application::services::RunOptions;
use crate::domain::{ClusterConfig, Credentials, FailurePolicy, ProvisionError};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::credentials::EnvCredentialSource;
use crate::infra::ssh::{SshExecutor, SshOptions};
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `KUBESTRAP_YES` env vars).
    pub yes: bool,
}

/// Where configuration and credentials come from.
pub struct SourceFlags {
    /// `--config`.
    pub config: Option<PathBuf>,
    /// `--env-file`.
    pub env_file: Option<PathBuf>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
    /// Configuration and credential sources.
    pub sources: SourceFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Context for per-step progress; also quiet under `--json` so stdout
    /// carries only the JSON document.
    pub progress: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Cluster configuration store.
    pub config_store: YamlConfigStore,
    /// SSH credential source.
    pub credentials: EnvCredentialSource,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `KUBESTRAP_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: AppFlags) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("KUBESTRAP_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            progress: OutputContext::new(
                flags.output.no_color,
                flags.output.quiet || flags.output.json,
            ),
            mode,
            config_store: YamlConfigStore::new(flags.sources.config),
            credentials: EnvCredentialSource::new(flags.sources.env_file),
            non_interactive,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Load and validate the cluster configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read or is invalid.
    pub fn load_config(&self) -> Result<ClusterConfig> {
        self.config_store.load()
    }

    /// Resolve SSH credentials, warning when the env file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is unset.
    pub fn load_credentials(&self, need_password: bool) -> Result<Credentials> {
        let loaded = self.credentials.load(need_password)?;
        if !loaded.env_file_found && !self.is_json() {
            self.output.warn(&format!(
                "{} not found, using the process environment only",
                self.credentials.env_file().display()
            ));
        }
        Ok(loaded.credentials)
    }

    /// Build the SSH executor for this invocation.
    #[must_use]
    pub fn executor(
        &self,
        cfg: &ClusterConfig,
        credentials: Credentials,
    ) -> SshExecutor<TokioCommandRunner> {
        let runner = TokioCommandRunner::new(Duration::from_secs(cfg.ssh.command_timeout_secs));
        let options = SshOptions {
            host_key: cfg.ssh.strict_host_key_checking,
            connect_timeout: Duration::from_secs(cfg.ssh.connect_timeout_secs),
        };
        SshExecutor::new(runner, credentials, options)
    }

    /// Run policies from configuration and `--keep-going`.
    #[must_use]
    pub fn run_options(cfg: &ClusterConfig, keep_going: bool) -> RunOptions {
        RunOptions {
            on_unreachable: cfg.probes.on_unreachable,
            on_failure: if keep_going {
                FailurePolicy::KeepGoing
            } else {
                FailurePolicy::Abort
            },
        }
    }

    /// Render `report`, then fail if any host failed.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::RunFailed`] naming the failed hosts, or an
    /// error if rendering fails. Under `--json` the failure is already part
    /// of the rendered report.
    pub fn finish(&self, report: &RunReport) -> Result<()> {
        self.renderer().render_report(report)?;
        match ProvisionError::run_failed(report) {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `KUBESTRAP_YES` env),
    /// returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
