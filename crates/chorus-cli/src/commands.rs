//! Command implementations

use crate::cli::{AnalyzeArgs, ExtractArgs};
use crate::transcript::Transcript;
use chorus_dispatch::FanoutDispatcher;
use chorus_domain::embedding::HashEmbeddingBackend;
use chorus_domain::{ClaimArtifact, SessionId};
use chorus_extractor::StatementExtractor;
use chorus_pipeline::{MemoryContextStore, PipelineConfig, ScriptedMapper, TurnPipeline};
use std::sync::Arc;

/// Run the synthesis pipeline over a captured transcript.
pub async fn execute_analyze(args: AnalyzeArgs, config: PipelineConfig) -> anyhow::Result<()> {
    let transcript = Transcript::load(&args.input)?;
    let mapper_output = transcript.mapper_output.clone().unwrap_or_default();

    let dispatcher = Arc::new(FanoutDispatcher::new(config.dispatch.clone()));
    let pipeline = TurnPipeline::new(
        dispatcher,
        Arc::new(MemoryContextStore::new()),
        Arc::new(HashEmbeddingBackend::new(config.embedding_dimension)),
        Arc::new(ScriptedMapper::new(mapper_output)),
        config,
    );

    let session = SessionId::generate();
    let artifact = pipeline
        .mapping_step(&session, &transcript.query, &transcript.transcripts)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
    } else {
        print_summary(&artifact);
    }
    Ok(())
}

/// Print the extraction pass output for a captured transcript.
pub fn execute_extract(args: ExtractArgs, config: PipelineConfig) -> anyhow::Result<()> {
    let transcript = Transcript::load(&args.input)?;
    let extraction = StatementExtractor::new(config.extractor).extract_all(&transcript.transcripts);

    for paragraph in &extraction.paragraphs {
        println!("[{}] (model {})", paragraph.id, paragraph.model_index);
        for sid in &paragraph.statement_ids {
            if let Some(statement) = extraction.statements.iter().find(|s| &s.id == sid) {
                println!("  [{}] {}", statement.id, statement.text);
            }
        }
    }
    println!(
        "\n{} statements in {} paragraphs",
        extraction.statements.len(),
        extraction.paragraphs.len()
    );
    Ok(())
}

fn print_summary(artifact: &ClaimArtifact) {
    if artifact.parse_failed {
        println!("mapper output unparseable; raw text preserved");
        println!("{} statements extracted", artifact.shadow_statements.len());
        return;
    }

    for tier in &artifact.tiers {
        let kind = if tier.index == 0 { "foundation" } else { "conflict" };
        println!("tier {} ({})", tier.index, kind);
        for id in &tier.claim_ids {
            if let Some(claim) = artifact.claims.iter().find(|c| &c.id == id) {
                println!(
                    "  [{}] {} (support {:.0}%, {} statements)",
                    claim.id,
                    claim.label,
                    claim.support_ratio * 100.0,
                    claim.canonical_statement_ids.len()
                );
            }
        }
    }

    if !artifact.forcing_points.is_empty() {
        println!("\nopen questions:");
        for point in &artifact.forcing_points {
            println!("  [{}] {}", point.id, point.question);
        }
    }

    if let Some(substrate) = &artifact.substrate {
        println!(
            "\nsubstrate: {} nodes, {} regions, geometry {:?}{}",
            substrate.node_count,
            substrate.region_count,
            substrate.geometry,
            if substrate.degenerate { " (degenerate)" } else { "" }
        );
    }
    if let Some(completeness) = &artifact.completeness {
        println!(
            "coverage: {:.0}% of {} statements cited",
            completeness.cited_ratio() * 100.0,
            completeness.fates.len()
        );
    }
    if artifact.survey_skipped {
        println!("survey: skipped (consensus)");
    } else {
        let axes: Vec<&str> = artifact.axes.iter().map(|a| a.as_str()).collect();
        println!("survey axes: {}", axes.join(", "));
    }
}
