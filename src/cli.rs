// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ekdosi")]
#[command(about = "Build, push, and roll out container app revisions")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit JSON lines instead of human-readable output
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub json: bool,

    /// Only print final results
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ekdosi.yml configuration file
    Init {
        /// App name to seed the config with
        #[arg(long)]
        app: Option<String>,

        /// Registry repository for the app (like "acme/webapp")
        #[arg(long)]
        repository: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Build, push, and roll out configured apps
    Deploy {
        /// Roll out only this app
        #[arg(short, long)]
        app: Option<String>,

        /// Immutable release tag (defaults to the current git commit)
        #[arg(short, long)]
        revision: Option<String>,

        /// Break a live rollout lock instead of honoring it
        #[arg(long)]
        force: bool,
    },

    /// Show platform revisions for configured apps
    Status {
        /// Show only this app
        #[arg(short, long)]
        app: Option<String>,
    },

    /// Route traffic back to the previous healthy revision
    Rollback {
        /// Roll back only this app
        #[arg(short, long)]
        app: Option<String>,

        /// Break a live rollout lock instead of honoring it
        #[arg(long)]
        force: bool,
    },
}
