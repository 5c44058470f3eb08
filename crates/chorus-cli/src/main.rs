//! Chorus CLI - multi-model answer synthesis over captured transcripts.

mod cli;
mod commands;
mod transcript;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use chorus_pipeline::PipelineConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            PipelineConfig::from_toml(&raw)?
        }
        None => PipelineConfig::default(),
    };

    match cli.command {
        Command::Analyze(args) => commands::execute_analyze(args, config).await?,
        Command::Extract(args) => commands::execute_extract(args, config)?,
    }
    Ok(())
}
