//! Argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Multi-model answer synthesis over captured provider transcripts.
#[derive(Debug, Parser)]
#[command(name = "chorus", version, about)]
pub struct Cli {
    /// Path to a TOML pipeline config; defaults apply when absent.
    #[arg(long, global = true, env = "CHORUS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the synthesis pipeline over a transcript file and print the
    /// resulting claim artifact.
    Analyze(AnalyzeArgs),
    /// Print the statements and paragraphs extracted from a transcript file.
    Extract(ExtractArgs),
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// JSON transcript file: `{"query", "transcripts", "mapper_output"}`.
    pub input: PathBuf,

    /// Print the full artifact as JSON instead of the summary.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// JSON transcript file.
    pub input: PathBuf,
}
