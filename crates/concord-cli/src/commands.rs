//! CLI commands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Concord - conversation event reconciliation
#[derive(Parser, Debug)]
#[command(name = "concord")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (concord.jsonc, .json, .yml or .yaml); searched for when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded event log and print the reconciled transcripts
    Replay {
        /// JSON-lines log file
        log: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Print per-channel event counts
        #[arg(long)]
        stats: bool,
    },

    /// Print the effective configuration
    Config,
}
