//! Layered configuration CLI
//!
//! # Usage
//!
//! ```bash
//! # Resolve PORT from the environment, then db/port in Secrets Manager, then 5433
//! layered-config get --kind integer --env PORT --secret db/port --default 5433 --required
//!
//! # Write a secret under the configured prefix
//! layered-config --secretsmanager-prefix prod/api write --value 9090 --secret port
//!
//! # Show the effective settings
//! layered-config show-config --format json
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Required value not found
//! - 2: Invalid input, settings or value
//! - 3: Secret store or credential error

mod cli;

use clap::Parser;
use cli::{ExitCode, LayeredCli};
use tracing::Level;

#[tokio::main]
async fn main() {
    let cli = LayeredCli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli::run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from_error(&err)
        }
    };
    std::process::exit(exit_code.into());
}
