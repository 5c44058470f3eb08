//! Chorus Provenance Allocation
//!
//! Assigns extracted statements to mapper-labeled claims as evidence. Three
//! cooperating passes run per claim:
//!
//! - `competitive`: sparse, high-precision thresholded assignment with
//!   normalized excess weights
//! - `continuous`: unthresholded evidence field used to detect statements the
//!   competitive pass wrongly excluded
//! - `merge`: the mixed-method pool union and core/boundary/removed
//!   classification that produces each claim's canonical statement set
//!
//! The allocator is pure CPU work over embeddings already in hand; it makes
//! no model calls and never suspends.

#![warn(missing_docs)]

pub mod competitive;
pub mod continuous;
pub mod merge;

use chorus_domain::embedding::centroid;
use chorus_domain::{Claim, ClaimId, Paragraph, Statement, StatementId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use competitive::CompetitiveAllocation;
pub use continuous::EvidenceField;
pub use merge::{MergeClass, MergeReport, PoolOrigin};

/// Allocation tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// z-score above which a statement enters a claim's core set in the
    /// continuous pass.
    pub core_z: f32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self { core_z: 1.0 }
    }
}

/// One claim as returned by the mapper, before evidence allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSeed {
    /// Derived claim id.
    pub id: ClaimId,
    /// The assertion text.
    pub label: String,
    /// Statement ids the mapper cited for this claim.
    pub cited: Vec<StatementId>,
    /// Model indices the mapper declared as supporters.
    pub supporters: Vec<usize>,
    /// Embedding of the label text, used as a centroid fallback when no
    /// cited statement resolves.
    pub label_embedding: Option<Vec<f32>>,
}

/// Everything the allocator needs for one turn.
pub struct AllocationInput<'a> {
    /// The turn's statements.
    pub statements: &'a [Statement],
    /// The turn's paragraphs.
    pub paragraphs: &'a [Paragraph],
    /// One embedding per statement, aligned by index.
    pub statement_embeddings: &'a [Vec<f32>],
    /// One embedding per paragraph, aligned by index.
    pub paragraph_embeddings: &'a [Vec<f32>],
    /// Number of models in the turn's provider result set.
    pub model_count: usize,
}

/// The allocator's full output: finished claims plus the per-pass reports
/// the auditor consumes.
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    /// Claims with canonical evidence attached, in seed order.
    pub claims: Vec<Claim>,
    /// The competitive pass result.
    pub competitive: CompetitiveAllocation,
    /// The continuous evidence field.
    pub evidence: EvidenceField,
    /// One merge report per claim, in seed order.
    pub merges: Vec<MergeReport>,
}

/// Runs the three allocation passes.
pub struct Allocator {
    config: AllocatorConfig,
}

impl Allocator {
    /// Create an allocator with explicit tuning.
    pub fn new(config: AllocatorConfig) -> Self {
        Self { config }
    }

    /// Allocate evidence to every seed claim.
    ///
    /// Seeds whose centroid cannot be computed (no resolvable citations and
    /// no label embedding) yield claims with empty canonical sets.
    pub fn allocate(&self, seeds: &[ClaimSeed], input: &AllocationInput<'_>) -> AllocationOutcome {
        let centroids: Vec<Option<Vec<f32>>> = seeds
            .iter()
            .map(|seed| claim_centroid(seed, input))
            .collect();

        let competitive =
            competitive::allocate(&centroids, input.statement_embeddings, input.statements);
        let evidence = continuous::field(
            &centroids,
            input.statement_embeddings,
            self.config.core_z,
        );

        let mut claims = Vec::with_capacity(seeds.len());
        let mut merges = Vec::with_capacity(seeds.len());
        for (idx, seed) in seeds.iter().enumerate() {
            let report = match &centroids[idx] {
                Some(centroid) => merge::merge(
                    idx,
                    centroid,
                    seed,
                    input,
                    &competitive,
                    &evidence,
                ),
                None => {
                    warn!(claim = %seed.id, "no centroid, claim gets no evidence");
                    MergeReport::empty()
                }
            };

            let bulk = competitive.claim_mass(idx);
            let support_ratio = if input.model_count == 0 {
                0.0
            } else {
                seed.supporters.len() as f64 / input.model_count as f64
            };
            claims.push(Claim {
                id: seed.id.clone(),
                label: seed.label.clone(),
                canonical_statement_ids: report.canonical.clone(),
                supporters: seed.supporters.clone(),
                support_ratio,
                bulk,
                tier: None,
                edges: Vec::new(),
            });
            merges.push(report);
        }

        debug!(
            claims = claims.len(),
            statements = input.statements.len(),
            "allocation finished"
        );
        AllocationOutcome {
            claims,
            competitive,
            evidence,
            merges,
        }
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new(AllocatorConfig::default())
    }
}

/// Mean embedding of the mapper's cited statements, falling back to the
/// label embedding when none resolve.
fn claim_centroid(seed: &ClaimSeed, input: &AllocationInput<'_>) -> Option<Vec<f32>> {
    let cited: Vec<&[f32]> = seed
        .cited
        .iter()
        .filter_map(|sid| {
            input
                .statements
                .iter()
                .position(|s| &s.id == sid)
                .map(|i| input.statement_embeddings[i].as_slice())
        })
        .collect();

    match centroid(&cited) {
        Some(c) => Some(c),
        None => seed.label_embedding.clone(),
    }
}
