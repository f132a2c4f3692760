// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shipwright")]
#[command(about = "Staged release deployment over pluggable transports")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit JSON lines instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new shipwright.yml configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Deploy a release to the configured hosts
    Deploy {
        /// Version label for the new release
        #[arg(short, long)]
        version: String,

        /// Commit or tag the release is built from
        #[arg(long)]
        reference: Option<String>,

        /// Version currently live, used to diff and roll back
        #[arg(long)]
        current: Option<String>,

        /// Break an existing deploy lock
        #[arg(long)]
        force: bool,
    },

    /// Roll back to a previously deployed release
    Rollback {
        /// Version currently live that should be rolled back
        #[arg(short, long)]
        version: String,

        /// Version to re-activate
        #[arg(long)]
        previous: Option<String>,

        /// Break an existing deploy lock
        #[arg(long)]
        force: bool,
    },

    /// Show the configured hosts and workspace
    Status,
}
