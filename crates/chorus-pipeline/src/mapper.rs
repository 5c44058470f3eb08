//! Tolerant parsing of mapper output
//!
//! The mapper is an LLM: its structured output arrives as raw text, often
//! wrapped in a markdown code fence, and individual items can be malformed.
//! Parsing is tolerant per item (a bad claim, edge, or conditional is
//! skipped with a warning) and fatal only when no claim list can be
//! recovered at all. The caller degrades fatal failures to a raw-text
//! artifact rather than failing the turn.

use chorus_allocator::ClaimSeed;
use chorus_dispatch::{FanoutDispatcher, FanoutRequest};
use chorus_domain::error::MapperError;
use chorus_domain::traits::ClaimMapper;
use chorus_domain::{
    ClaimEdge, ClaimId, Conditional, EdgeKind, PreSemanticSummary, ProviderId, SessionId,
    StatementId,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct RawClaim {
    label: String,
    #[serde(default)]
    cited: Vec<String>,
    #[serde(default)]
    supporters: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    from: String,
    to: String,
    kind: String,
    #[serde(default)]
    question: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConditional {
    description: String,
    #[serde(default)]
    affected: Vec<String>,
    #[serde(default)]
    question: Option<String>,
}

/// The mapper's parsed structured output.
#[derive(Debug, Default)]
pub struct MapperOutput {
    /// Claims in mapper order, ids derived from position. Label embeddings
    /// are attached later by the pipeline.
    pub seeds: Vec<ClaimSeed>,
    /// Claim relations.
    pub edges: Vec<ClaimEdge>,
    /// Conditional branches.
    pub conditionals: Vec<Conditional>,
}

/// Parse raw mapper text into seeds, edges, and conditionals.
///
/// # Errors
///
/// Fails with [`MapperError::ParseFailed`] when the text contains no JSON
/// object or the object has no usable `claims` array. Malformed individual
/// items are skipped, not fatal.
pub fn parse_mapper_output(raw: &str) -> Result<MapperOutput, MapperError> {
    let body = strip_code_fence(raw);
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| MapperError::ParseFailed(e.to_string()))?;

    let claims = value
        .get("claims")
        .and_then(|c| c.as_array())
        .ok_or_else(|| MapperError::ParseFailed("no claims array".to_string()))?;

    let mut output = MapperOutput::default();
    for item in claims {
        match serde_json::from_value::<RawClaim>(item.clone()) {
            Ok(raw_claim) if raw_claim.label.trim().is_empty() => {
                warn!("claim with empty label skipped");
            }
            Ok(raw_claim) => {
                let ordinal = output.seeds.len();
                output.seeds.push(ClaimSeed {
                    id: ClaimId::derive(ordinal),
                    label: raw_claim.label,
                    cited: raw_claim.cited.into_iter().map(StatementId::new).collect(),
                    supporters: raw_claim.supporters,
                    label_embedding: None,
                });
            }
            Err(e) => warn!(error = %e, "malformed claim skipped"),
        }
    }
    if output.seeds.is_empty() {
        return Err(MapperError::ParseFailed("no usable claims".to_string()));
    }

    for item in array_of(&value, "edges") {
        match serde_json::from_value::<RawEdge>(item.clone()) {
            Ok(raw_edge) => {
                let kind = match raw_edge.kind.as_str() {
                    "conflicts" => EdgeKind::Conflicts,
                    "supports" => EdgeKind::Supports,
                    other => {
                        warn!(kind = other, "unknown edge kind skipped");
                        continue;
                    }
                };
                output.edges.push(ClaimEdge {
                    from: ClaimId::new(raw_edge.from),
                    to: ClaimId::new(raw_edge.to),
                    kind,
                    question: raw_edge.question,
                });
            }
            Err(e) => warn!(error = %e, "malformed edge skipped"),
        }
    }

    for item in array_of(&value, "conditionals") {
        match serde_json::from_value::<RawConditional>(item.clone()) {
            Ok(raw_cond) => output.conditionals.push(Conditional {
                description: raw_cond.description,
                affected: raw_cond.affected.into_iter().map(ClaimId::new).collect(),
                question: raw_cond.question,
            }),
            Err(e) => warn!(error = %e, "malformed conditional skipped"),
        }
    }

    debug!(
        claims = output.seeds.len(),
        edges = output.edges.len(),
        conditionals = output.conditionals.len(),
        "mapper output parsed"
    );
    Ok(output)
}

fn array_of<'a>(value: &'a serde_json::Value, key: &str) -> &'a [serde_json::Value] {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

/// Strip a surrounding markdown code fence, with or without a language tag.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag line.
    match rest.split_once('\n') {
        Some((_, body)) => body.trim(),
        None => rest.trim(),
    }
}

/// A [`ClaimMapper`] backed by one provider through the fan-out dispatcher.
///
/// The mapping call goes through the same circuit-breaker and cancellation
/// machinery as the prompt fan-out.
pub struct DispatcherMapper {
    dispatcher: Arc<FanoutDispatcher>,
    provider: ProviderId,
    session: SessionId,
}

impl DispatcherMapper {
    /// Create a mapper routing through `provider` on `dispatcher`.
    pub fn new(dispatcher: Arc<FanoutDispatcher>, provider: ProviderId, session: SessionId) -> Self {
        Self {
            dispatcher,
            provider,
            session,
        }
    }
}

#[async_trait]
impl ClaimMapper for DispatcherMapper {
    async fn label(&self, summary: &PreSemanticSummary) -> Result<String, MapperError> {
        let prompt = crate::summary::render_prompt(summary);
        let request = FanoutRequest::new(
            self.session.clone(),
            "mapping",
            prompt,
            vec![self.provider.clone()],
        );
        let settlement = self
            .dispatcher
            .dispatch(request, None)
            .await
            .map_err(|e| MapperError::Call(e.to_string()))?;
        settlement
            .texts_in_request_order()
            .into_iter()
            .next()
            .map(|(_, text)| text)
            .ok_or_else(|| MapperError::Call("mapper provider produced no text".to_string()))
    }
}

/// A [`ClaimMapper`] returning fixed text, for tests and replayed transcripts.
pub struct ScriptedMapper {
    text: String,
}

impl ScriptedMapper {
    /// A mapper that always returns `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl ClaimMapper for ScriptedMapper {
    async fn label(&self, _summary: &PreSemanticSummary) -> Result<String, MapperError> {
        Ok(self.text.clone())
    }
}
