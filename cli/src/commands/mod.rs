//! Command implementations

pub mod bootstrap;
pub mod hosts;
pub mod provision;
pub mod trust;
pub mod up;
pub mod version;

use clap::Args;

/// Arguments shared by commands that walk the hosts.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Continue with the next host after a failure instead of stopping
    #[arg(long)]
    pub keep_going: bool,
}
