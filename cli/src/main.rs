//! kubestrap - passwordless SSH trust and kubeadm clusters over plain SSH

use clap::Parser;
use kubestrap_cli::cli::Cli;
use kubestrap_cli::output::json::{already_reported, error_code, format_error};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(e) = cli.run().await {
        let message = format!("{e:#}");
        match format_error(&message, error_code(&e)) {
            Ok(_) if json && already_reported(&e) => {}
            Ok(obj) if json => println!("{obj}"),
            _ => eprintln!("Error: {message}"),
        }
        std::process::exit(1);
    }
}
