// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leadflow operator CLI.
//!
//! Inspects the configured backend, migrates local data to the remote
//! backend and runs the conversion outbox dispatcher.

mod backend;
mod dispatch;
mod login;
mod migrate;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use leadflow_config::LeadflowConfig;
use leadflow_core::LeadflowError;

/// Leadflow - lead management persistence tooling.
#[derive(Parser, Debug)]
#[command(name = "leadflow", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the active backend, its capabilities and health.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Copy local data into the remote backend.
    Migrate {
        /// Count what would be copied without writing.
        #[arg(long)]
        dry_run: bool,
        /// Output the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Deliver conversion notifications from the outbox.
    Dispatch {
        /// Drain the outbox once and exit instead of polling.
        #[arg(long)]
        once: bool,
        /// Return exhausted notifications to the queue before dispatching.
        #[arg(long)]
        requeue_failed: bool,
    },
    /// Verify a username and password against the active backend.
    Login {
        username: String,
    },
}

fn load_config(path: Option<&std::path::Path>) -> LeadflowConfig {
    let loaded = match path {
        Some(path) => leadflow_config::load_and_validate_path(path),
        None => leadflow_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            leadflow_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("leadflow={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, config: LeadflowConfig) -> Result<(), LeadflowError> {
    match cli.command {
        Commands::Status { json } => status::run_status(&config, json).await,
        Commands::Migrate { dry_run, json } => migrate::run_migrate(&config, dry_run, json).await,
        Commands::Dispatch {
            once,
            requeue_failed,
        } => dispatch::run_dispatch(&config, once, requeue_failed).await,
        Commands::Login { username } => login::run_login(&config, &username).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    init_tracing(&config.logging.level);

    if let Err(e) = run(cli, config).await {
        eprintln!("leadflow: {e}");
        std::process::exit(1);
    }
}
