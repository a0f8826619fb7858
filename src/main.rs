//! codesync command-line entry point.

use std::process::ExitCode;

use clap::Parser;
use codesync::Settings;
use codesync::cli::commands::{config, init, pending, watch};
use codesync::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            eprintln!("Using default configuration.");
            Settings::default()
        }
    };

    codesync::logging::init_with_config(&settings.logging);

    match run(cli.command, &settings).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, settings: &Settings) -> anyhow::Result<bool> {
    match command {
        Commands::Init {
            path,
            token,
            daemon,
            branch,
        } => {
            init::run_init(
                settings,
                init::InitArgs {
                    path,
                    token,
                    daemon,
                    branch,
                },
            )
            .await
        }
        Commands::Watch { path, debounce_ms } => {
            watch::run_watch(settings, path, debounce_ms).await?;
            Ok(true)
        }
        Commands::Pending { patches } => {
            pending::run_pending(settings, patches)?;
            Ok(true)
        }
        Commands::Config { init, force } => {
            config::run_config(settings, init, force)?;
            Ok(true)
        }
    }
}
