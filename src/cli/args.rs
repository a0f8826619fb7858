//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and the Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Change tracking and sync bootstrap client
#[derive(Parser, Debug)]
#[command(
    name = "codesync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Track source changes and bootstrap repositories for sync",
    long_about = "Seed shadow mirrors for a repository, then record every change as a pending diff.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Examples:\n  codesync init --token <TOKEN>\n  codesync init ../service --branch\n  codesync watch\n  codesync pending\n  codesync config"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bootstrap a repository
    #[command(
        about = "Seed mirrors for a repository and hand it to the uploader",
        after_help = "The current directory is used when PATH is omitted.\n\nExit status is 1 when bootstrap aborts."
    )]
    Init {
        /// Repository root
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Access token for the sync service
        #[arg(long, env = "CODESYNC_TOKEN", hide_env_values = true)]
        token: String,

        /// Run unattended: no prompts, continue when the service is unreachable
        #[arg(long)]
        daemon: bool,

        /// Sync only the current branch of an already synced repository
        #[arg(long)]
        branch: bool,
    },

    /// Record changes as they happen
    #[command(about = "Watch a bootstrapped repository and buffer diffs")]
    Watch {
        /// Repository root
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Quiet period before a modified file is diffed (overrides config)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// List buffered diff records
    #[command(about = "Show diff records waiting for upload")]
    Pending {
        /// Print the patch text of modification records
        #[arg(long)]
        patches: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config {
        /// Write the active settings to settings.toml
        #[arg(long)]
        init: bool,

        /// Overwrite an existing settings.toml
        #[arg(short, long, requires = "init")]
        force: bool,
    },
}
