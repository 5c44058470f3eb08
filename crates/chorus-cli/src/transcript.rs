//! Captured-transcript input format

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// One captured turn: the query, each provider's full answer text, and the
/// raw mapper output recorded for that turn.
#[derive(Debug, Deserialize)]
pub struct Transcript {
    /// The user query the providers answered.
    pub query: String,
    /// One answer per provider, in model-index order.
    pub transcripts: Vec<String>,
    /// Raw mapper output captured for this turn; when absent, `analyze`
    /// degrades the turn exactly as an unparseable live mapper would.
    #[serde(default)]
    pub mapper_output: Option<String>,
}

impl Transcript {
    /// Load a transcript from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}
