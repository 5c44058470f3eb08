//! Turn orchestration
//!
//! Runs one turn through its three steps:
//!
//! 1. prompt: fan the user query out to every configured provider, persist
//!    the provider contexts fire-and-forget
//! 2. mapping: extraction, embedding, substrate, clustering, the mapper
//!    call, allocation, graph assembly, blast radius, audit
//! 3. survey: follow-up fan-out gated by the blast-radius axes
//!
//! Steps are strictly sequential within a turn; turns are independent. A
//! mapper parse failure degrades the turn to a raw-text artifact instead of
//! failing it.

use crate::config::PipelineConfig;
use crate::mapper::parse_mapper_output;
use crate::summary::build_summary;
use chorus_allocator::{AllocationInput, Allocator};
use chorus_dispatch::{DispatchError, FanoutDispatcher, FanoutRequest, FanoutSettlement};
use chorus_domain::embedding::{cosine_similarity, EmbeddingBackend, EmbeddingError};
use chorus_domain::error::MapperError;
use chorus_domain::traits::{ClaimMapper, ContextRole, ContextStore, ProviderContext};
use chorus_domain::{ClaimArtifact, ForcingPoint, SessionId};
use chorus_extractor::StatementExtractor;
use chorus_graph::{alignment, assemble, completeness, score_claims, survey_skippable};
use chorus_substrate::{assign_regions, cluster, SubstrateBuilder, SubstrateError};
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that fail a turn outright.
///
/// Everything recoverable (mapper parse failure, degenerate substrate,
/// partial provider failure) is absorbed into the artifact instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The fan-out produced no usable text at all.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The embedding backend failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Malformed substrate input; indicates a pipeline bug, not bad data.
    #[error(transparent)]
    Substrate(#[from] SubstrateError),

    /// The mapper call itself failed (distinct from unparseable output).
    #[error("mapper call failed: {0}")]
    Mapper(String),
}

/// Result of one full turn.
#[derive(Debug)]
pub struct TurnOutcome {
    /// The prompt step's settlement.
    pub settlement: FanoutSettlement,
    /// The synthesized artifact.
    pub artifact: ClaimArtifact,
    /// The survey settlement, when the survey step ran.
    pub survey: Option<FanoutSettlement>,
}

/// Orchestrates turns over injected capabilities.
pub struct TurnPipeline {
    dispatcher: Arc<FanoutDispatcher>,
    store: Arc<dyn ContextStore>,
    embeddings: Arc<dyn EmbeddingBackend>,
    mapper: Arc<dyn ClaimMapper>,
    config: PipelineConfig,
}

impl TurnPipeline {
    /// Create a pipeline over explicit capabilities.
    pub fn new(
        dispatcher: Arc<FanoutDispatcher>,
        store: Arc<dyn ContextStore>,
        embeddings: Arc<dyn EmbeddingBackend>,
        mapper: Arc<dyn ClaimMapper>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            dispatcher,
            store,
            embeddings,
            mapper,
            config,
        }
    }

    /// Run one full turn: prompt, mapping, survey.
    pub async fn run_turn(
        &self,
        session: &SessionId,
        query: &str,
    ) -> Result<TurnOutcome, PipelineError> {
        let settlement = self.prompt_step(session, query).await?;
        let texts: Vec<String> = settlement
            .texts_in_request_order()
            .into_iter()
            .map(|(_, text)| text)
            .collect();
        let artifact = self.mapping_step(session, query, &texts).await?;
        let survey = self.survey_step(session, &artifact).await?;
        Ok(TurnOutcome {
            settlement,
            artifact,
            survey,
        })
    }

    /// Fan the user query out and persist provider contexts.
    ///
    /// Persistence is fire-and-forget: it is spawned and never awaited, a
    /// storage failure only logs.
    pub async fn prompt_step(
        &self,
        session: &SessionId,
        query: &str,
    ) -> Result<FanoutSettlement, PipelineError> {
        let request = FanoutRequest::new(
            session.clone(),
            "prompt",
            query,
            self.config.providers.clone(),
        );
        let settlement = self.dispatcher.dispatch(request, None).await?;
        self.persist_contexts(session, &settlement, ContextRole::Prompt);
        Ok(settlement)
    }

    /// Synthesize the claim artifact from the providers' answer texts.
    pub async fn mapping_step(
        &self,
        session: &SessionId,
        query: &str,
        texts: &[String],
    ) -> Result<ClaimArtifact, PipelineError> {
        let extractor = StatementExtractor::new(self.config.extractor.clone());
        let extraction = extractor.extract_all(texts);
        if extraction.paragraphs.is_empty() {
            warn!(session = %session, "no extractable statements, degrading to raw text");
            return Ok(ClaimArtifact::raw_text_only(
                extraction.statements,
                texts.join("\n\n"),
            ));
        }

        // Geometry.
        let paragraph_texts: Vec<String> = extraction
            .paragraphs
            .iter()
            .map(|p| p.text.clone())
            .collect();
        let paragraph_embeddings = self.embeddings.embed(&paragraph_texts)?;
        let statement_texts: Vec<String> = extraction
            .statements
            .iter()
            .map(|s| s.text.clone())
            .collect();
        let statement_embeddings = self.embeddings.embed(&statement_texts)?;

        let builder = SubstrateBuilder::new(self.config.substrate.clone());
        let mut substrate = builder.build(&extraction.paragraphs, &paragraph_embeddings)?;
        if substrate.is_degenerate() {
            debug!(session = %session, "degenerate substrate, thresholds fall back to mean + sigma");
        }
        let clusters = cluster(&substrate, &self.config.cluster);
        assign_regions(&mut substrate, &clusters);

        // Mapper call and tolerant parse.
        let summary = build_summary(query, &extraction.paragraphs, &clusters);
        let raw = match self.mapper.label(&summary).await {
            Ok(raw) => raw,
            Err(MapperError::ParseFailed(reason)) => {
                warn!(session = %session, %reason, "mapper reported unparseable output");
                return Ok(ClaimArtifact::raw_text_only(extraction.statements, reason));
            }
            Err(MapperError::Call(reason)) => return Err(PipelineError::Mapper(reason)),
        };
        let mut parsed = match parse_mapper_output(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(session = %session, error = %e, "mapper output unparseable, degrading to raw text");
                return Ok(ClaimArtifact::raw_text_only(extraction.statements, raw));
            }
        };

        // Label embeddings double as the centroid fallback and the query
        // relevance signal.
        let labels: Vec<String> = parsed.seeds.iter().map(|s| s.label.clone()).collect();
        let label_embeddings = self.embeddings.embed(&labels)?;
        for (seed, embedding) in parsed.seeds.iter_mut().zip(&label_embeddings) {
            seed.label_embedding = Some(embedding.clone());
        }
        let query_embedding = self
            .embeddings
            .embed(std::slice::from_ref(&query.to_string()))?
            .pop()
            .unwrap_or_else(|| vec![0.0; self.embeddings.dimension()]);
        let relevance: Vec<f64> = label_embeddings
            .iter()
            .map(|e| cosine_similarity(&query_embedding, e).clamp(0.0, 1.0) as f64)
            .collect();

        // Allocation, assembly, scoring, audit.
        let input = AllocationInput {
            statements: &extraction.statements,
            paragraphs: &extraction.paragraphs,
            statement_embeddings: &statement_embeddings,
            paragraph_embeddings: &paragraph_embeddings,
            model_count: texts.len(),
        };
        let outcome = Allocator::new(self.config.allocator.clone()).allocate(&parsed.seeds, &input);

        let mut claims = outcome.claims.clone();
        let (tiers, forcing_points) = assemble(&mut claims, &parsed.edges, &parsed.conditionals);
        let (_, axes) = score_claims(&claims, &parsed.conditionals, &relevance, &self.config.blast);
        let survey_skipped =
            survey_skippable(&claims, &self.config.blast) || axes.is_empty();

        let completeness_report = completeness(&extraction.statements, &outcome);
        let regions: Vec<_> = clusters
            .iter()
            .map(|c| {
                let members = c
                    .members
                    .iter()
                    .filter_map(|&i| extraction.paragraphs.get(i))
                    .map(|p| p.id.clone())
                    .collect();
                (c.region.clone(), members)
            })
            .collect();
        let alignment_report =
            (!regions.is_empty()).then(|| alignment(&regions, &extraction.paragraphs, &outcome));

        // Coordinates onto the shadow statements.
        let mut shadow_statements = extraction.statements;
        for statement in &mut shadow_statements {
            let node = statement
                .paragraph
                .as_ref()
                .and_then(|pid| substrate.node_index(pid));
            if let Some(i) = node {
                statement.top_similarity = Some(substrate.nodes[i].top_similarity);
            }
        }

        let edges = claims.iter().flat_map(|c| c.edges.clone()).collect();
        info!(
            session = %session,
            claims = claims.len(),
            tiers = tiers.len(),
            forcing_points = forcing_points.len(),
            survey_skipped,
            "mapping step finished"
        );
        Ok(ClaimArtifact {
            claims,
            edges,
            conditionals: parsed.conditionals,
            tiers,
            forcing_points,
            shadow_statements,
            substrate: Some(substrate.summary(clusters.len())),
            completeness: Some(completeness_report),
            alignment: alignment_report,
            axes,
            survey_skipped,
            parse_failed: false,
            raw_mapper_text: None,
        })
    }

    /// Run the survey fan-out when the artifact's axes warrant one.
    pub async fn survey_step(
        &self,
        session: &SessionId,
        artifact: &ClaimArtifact,
    ) -> Result<Option<FanoutSettlement>, PipelineError> {
        if artifact.survey_skipped || artifact.axes.is_empty() {
            debug!(session = %session, "survey skipped");
            return Ok(None);
        }
        let prompt = survey_prompt(artifact);
        let request = FanoutRequest::new(
            session.clone(),
            "survey",
            prompt,
            self.config.providers.clone(),
        );
        let settlement = self.dispatcher.dispatch(request, None).await?;
        self.persist_contexts(session, &settlement, ContextRole::Survey);
        Ok(Some(settlement))
    }

    fn persist_contexts(
        &self,
        session: &SessionId,
        settlement: &FanoutSettlement,
        role: ContextRole,
    ) {
        let updates: Vec<ProviderContext> = settlement
            .texts_in_request_order()
            .into_iter()
            .map(|(provider, context)| ProviderContext { provider, context })
            .collect();
        if updates.is_empty() {
            return;
        }
        let store = Arc::clone(&self.store);
        let session = session.clone();
        tokio::spawn(async move {
            if let Err(e) = store.persist_contexts(&session, updates, role) {
                warn!(session = %session, error = %e, "context persistence failed");
            }
        });
    }
}

/// Render the survey follow-up prompt from the gated axes.
fn survey_prompt(artifact: &ClaimArtifact) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "The answers so far disagree on the points below. Address each one \
         directly."
    );
    for axis in &artifact.axes {
        if let Some(claim) = artifact.claims.iter().find(|c| &c.id == axis) {
            let _ = writeln!(prompt, "- {}", claim.label);
        }
        for point in forcing_points_for(artifact, axis) {
            let _ = writeln!(prompt, "  {}", point.question);
        }
    }
    prompt
}

fn forcing_points_for<'a>(
    artifact: &'a ClaimArtifact,
    axis: &chorus_domain::ClaimId,
) -> impl Iterator<Item = &'a ForcingPoint> {
    let axis = axis.clone();
    artifact
        .forcing_points
        .iter()
        .filter(move |p| p.claims.contains(&axis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_domain::{Claim, ClaimId, StatementId};

    fn claim(ordinal: usize, label: &str) -> Claim {
        Claim {
            id: ClaimId::derive(ordinal),
            label: label.to_string(),
            canonical_statement_ids: vec![StatementId::derive(ordinal, 0)],
            supporters: vec![0],
            support_ratio: 0.5,
            bulk: 1.0,
            tier: None,
            edges: Vec::new(),
        }
    }

    #[test]
    fn test_survey_prompt_lists_axis_labels() {
        let mut artifact = ClaimArtifact::raw_text_only(Vec::new(), String::new());
        artifact.parse_failed = false;
        artifact.claims = vec![claim(0, "Water boils at 100C"), claim(1, "Depends on altitude")];
        artifact.axes = vec![ClaimId::derive(1)];

        let prompt = survey_prompt(&artifact);
        assert!(prompt.contains("Depends on altitude"));
        assert!(!prompt.contains("Water boils at 100C"));
    }
}
