//! Concord - conversation event reconciliation

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use concord_cli::render::render_report;
use concord_cli::{parse_log, replay, Cli, Commands};
use concord_config::{find_all_config_files, load_config_or_default, EngineConfig};
use std::fs;
use std::path::Path;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config_or_default(cli.config.as_deref())?;

    if let Err(e) = concord_telemetry::try_init_subscriber(&config.telemetry) {
        eprintln!("{}: {}", "Warning".yellow().bold(), e);
    }

    match cli.command {
        Commands::Replay { log, json, stats } => run_replay(&log, &config, json, stats).await,
        Commands::Config => run_config(cli.config.as_deref(), &config),
    }
}

async fn run_replay(log: &Path, config: &EngineConfig, json: bool, stats: bool) -> Result<()> {
    let content = fs::read_to_string(log)
        .with_context(|| format!("Failed to read event log: {}", log.display()))?;
    let entries = parse_log(&content)?;
    tracing::info!("Replaying {} entries from {}", entries.len(), log.display());

    let report = replay(entries, config, stats).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

fn run_config(explicit: Option<&Path>, config: &EngineConfig) -> Result<()> {
    match explicit {
        Some(path) => println!("{} {}", "Config:".cyan().bold(), path.display()),
        None => match find_all_config_files().first() {
            Some(path) => println!("{} {}", "Config:".cyan().bold(), path.display()),
            None => println!("{} {}", "Config:".cyan().bold(), "(defaults)".dimmed()),
        },
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
