// ABOUTME: Entry point for the cosimport CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use cosimport::config::{self, Config};
use cosimport::error::Result;
use cosimport::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let cwd = env::current_dir()?;
    let output = Output::new(mode);

    match cli.command {
        Commands::Init { zone, force } => {
            config::init_config(&cwd, zone.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Apply { file } => {
            let config = Config::discover(&cwd)?;
            commands::apply(&config, &cwd, &file, output).await
        }
        Commands::Reconcile { name, watch } => {
            let config = Config::discover(&cwd)?;
            commands::reconcile(&config, &cwd, &name, watch, output).await
        }
        Commands::Delete { name } => {
            let config = Config::discover(&cwd)?;
            commands::delete(&config, &cwd, &name, output).await
        }
        Commands::Status { name } => {
            let config = Config::discover(&cwd)?;
            commands::status(&config, &cwd, name.as_deref(), output).await
        }
    }
}
