//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags, SourceFlags};
use crate::commands;

/// Bootstrap SSH trust and a kubeadm cluster over plain SSH
#[derive(Parser)]
#[command(
    name = "kubestrap",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Configuration file [default: ./kubestrap.yaml]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// File with SSH_USER / SSH_PASSWORD [default: ./.env]
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List hosts in execution order
    Hosts,

    /// Set up passwordless SSH and sudo on every host
    Trust,

    /// Prepare every cluster node for kubeadm
    Provision(commands::RunArgs),

    /// Initialize the control plane and join the workers
    Bootstrap(commands::RunArgs),

    /// Provision, then bootstrap
    Up(commands::RunArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            config,
            env_file,
            json,
            quiet,
            no_color,
            yes,
            command,
        } = self;
        let app = AppContext::new(AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
            sources: SourceFlags { config, env_file },
        });

        match command {
            Command::Hosts => commands::hosts::run(&app),
            Command::Trust => commands::trust::run(&app).await,
            Command::Provision(args) => commands::provision::run(&app, &args).await,
            Command::Bootstrap(args) => commands::bootstrap::run(&app, &args).await,
            Command::Up(args) => commands::up::run(&app, &args).await,
            Command::Version => commands::version::run(&app),
        }
    }
}
