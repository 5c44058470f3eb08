//! Per-turn output schema
//!
//! The `ClaimArtifact` is the single structure exposed to callers for a
//! mapping step. Optional sections (`substrate`, `completeness`, `alignment`)
//! are statically present-or-absent rather than inferred by field probing.

use crate::claim::{Claim, ClaimEdge, Conditional, ForcingPoint, TierLayer};
use crate::ids::{ClaimId, ParagraphId, RegionId, StatementId};
use crate::statement::Statement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Health band of the substrate's similarity geometry.
///
/// Derived from the discrimination range `D = P90 - P10` of the pairwise
/// similarity distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryHealth {
    /// D >= 0.10: thresholds discovered from this geometry can be trusted.
    Usable,
    /// 0.05 <= D < 0.10: usable with caution.
    Marginal,
    /// D < 0.05: the substrate cannot be trusted for thresholding.
    Untrusted,
}

impl GeometryHealth {
    /// Classify a discrimination range into a health band.
    pub fn from_discrimination(d: f32) -> Self {
        if d >= 0.10 {
            GeometryHealth::Usable
        } else if d >= 0.05 {
            GeometryHealth::Marginal
        } else {
            GeometryHealth::Untrusted
        }
    }
}

/// Summary of the substrate geometry attached to the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateSummary {
    /// Number of embedded paragraphs.
    pub node_count: usize,
    /// Discovered valley threshold `T_v`, absent when degenerate.
    pub valley: Option<f32>,
    /// Mean of the pairwise similarity distribution.
    pub mean: f32,
    /// Standard deviation of the pairwise similarity distribution.
    pub std_dev: f32,
    /// Discrimination range `P90 - P10`.
    pub discrimination: f32,
    /// Whether basin inversion failed to find a usable valley.
    pub degenerate: bool,
    /// Health band derived from the discrimination range.
    pub geometry: GeometryHealth,
    /// Number of regions the clustering engine produced.
    pub region_count: usize,
}

/// Final disposition of one statement after synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementFate {
    /// Directly cited: competitively allocated to a claim's canonical set.
    Primary,
    /// In a canonical set via boundary promotion or the claim-centric pool.
    Supporting,
    /// Passed relevance gating but placed in no canonical set.
    Unaddressed,
    /// Never entered any claim's candidate pool.
    Orphan,
    /// Explicitly rejected by the merge classification.
    Noise,
}

/// Coverage statistics between the statement set and the claim set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessReport {
    /// Fate of every statement in the turn.
    pub fates: BTreeMap<StatementId, StatementFate>,
}

impl CompletenessReport {
    /// Count statements with the given fate.
    pub fn count(&self, fate: StatementFate) -> usize {
        self.fates.values().filter(|f| **f == fate).count()
    }

    /// Fraction of statements that ended up cited (primary or supporting).
    pub fn cited_ratio(&self) -> f64 {
        if self.fates.is_empty() {
            return 0.0;
        }
        let cited = self.count(StatementFate::Primary) + self.count(StatementFate::Supporting);
        cited as f64 / self.fates.len() as f64
    }
}

/// Claim coverage for one substrate region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCoverage {
    /// The region.
    pub region: RegionId,
    /// Paragraphs in the region.
    pub paragraph_count: usize,
    /// Paragraphs with at least one statement cited by some claim.
    pub covered: usize,
}

impl RegionCoverage {
    /// Covered fraction, 0.0 for empty regions.
    pub fn ratio(&self) -> f64 {
        if self.paragraph_count == 0 {
            0.0
        } else {
            self.covered as f64 / self.paragraph_count as f64
        }
    }
}

/// Region-to-claim alignment statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    /// Per-region coverage.
    pub regions: Vec<RegionCoverage>,
    /// Regions with no covering claim at all.
    pub unattended: Vec<RegionId>,
}

/// The synthesized claim artifact for one mapping step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimArtifact {
    /// Synthesized claims with canonical evidence attached.
    pub claims: Vec<Claim>,
    /// All claim edges (also present on the owning claims).
    pub edges: Vec<ClaimEdge>,
    /// Conditional branches returned by the mapper.
    pub conditionals: Vec<Conditional>,
    /// Tier partition of the claim set.
    pub tiers: Vec<TierLayer>,
    /// Interactive decision nodes derived from conflicts and conditionals.
    pub forcing_points: Vec<ForcingPoint>,
    /// The turn's full statement set ("shadow statements").
    pub shadow_statements: Vec<Statement>,
    /// Substrate geometry summary, absent when embeddings were unavailable.
    pub substrate: Option<SubstrateSummary>,
    /// Completeness audit, absent when the mapper output could not be parsed.
    pub completeness: Option<CompletenessReport>,
    /// Alignment audit, absent when clustering produced no regions.
    pub alignment: Option<AlignmentReport>,
    /// Claims gated in as survey axes (at most 3).
    pub axes: Vec<ClaimId>,
    /// Whether the survey step was skipped under high consensus.
    pub survey_skipped: bool,
    /// Whether the mapper's structured output was malformed; when true the
    /// artifact carries raw text only and no claims.
    pub parse_failed: bool,
    /// Raw mapper text preserved for the degraded path.
    pub raw_mapper_text: Option<String>,
}

impl ClaimArtifact {
    /// A raw-text-only artifact for the `parse_failed` degraded path.
    pub fn raw_text_only(statements: Vec<Statement>, raw: String) -> Self {
        Self {
            claims: Vec::new(),
            edges: Vec::new(),
            conditionals: Vec::new(),
            tiers: Vec::new(),
            forcing_points: Vec::new(),
            shadow_statements: statements,
            substrate: None,
            completeness: None,
            alignment: None,
            axes: Vec::new(),
            survey_skipped: true,
            parse_failed: true,
            raw_mapper_text: Some(raw),
        }
    }
}

/// One paragraph as presented to the mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryParagraph {
    /// Paragraph id, referenced by mapper output.
    pub id: ParagraphId,
    /// Source model index.
    pub model_index: usize,
    /// Paragraph text.
    pub text: String,
}

/// One cluster as presented to the mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryCluster {
    /// Region id.
    pub region: RegionId,
    /// Member paragraphs.
    pub paragraph_ids: Vec<ParagraphId>,
    /// Whether the clustering engine marked the cluster uncertain.
    pub uncertain: bool,
}

/// The structured pre-semantic summary consumed by the claim mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreSemanticSummary {
    /// The user query the fan-out answered.
    pub query: String,
    /// All paragraphs in the turn.
    pub paragraphs: Vec<SummaryParagraph>,
    /// Clusters over the paragraphs (may be empty).
    pub clusters: Vec<SummaryCluster>,
}
