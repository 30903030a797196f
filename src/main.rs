// ABOUTME: Entry point for the ekdosi CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use ekdosi::config::{self, Config};
use ekdosi::error::Result;
use ekdosi::output::{Output, OutputMode};
use std::env;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);

    // Ctrl-C asks in-flight rollouts to stop at the next safe point.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping at the next safe point");
                cancel.cancel();
            }
        });
    }

    let result = run(cli, output, &cancel).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output, cancel: &CancellationToken) -> Result<()> {
    match cli.command {
        Commands::Init {
            app,
            repository,
            force,
        } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, app.as_deref(), repository.as_deref(), force)?;
            output.success("Created ekdosi.yml");
            Ok(())
        }
        Commands::Deploy {
            app,
            revision,
            force,
        } => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            commands::deploy(config, app.as_deref(), revision, force, output, cancel).await
        }
        Commands::Status { app } => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            commands::status(config, app.as_deref(), output).await
        }
        Commands::Rollback { app, force } => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            commands::rollback(config, app.as_deref(), force, output, cancel).await
        }
    }
}
