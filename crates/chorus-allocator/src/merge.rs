//! Mixed-method merge
//!
//! Produces each claim's canonical statement set. The claim-centric
//! paragraph pool (recall) is unioned with the competitive paragraph pool
//! (precision), every pooled statement is classified against the pool-wide
//! similarity distribution, and boundary statements survive only when they
//! are specifically aligned with this claim rather than generically
//! on-topic. A final supporter filter drops statements from models the
//! mapper did not declare as supporters.

use crate::competitive::CompetitiveAllocation;
use crate::continuous::EvidenceField;
use crate::{AllocationInput, ClaimSeed};
use chorus_domain::embedding::cosine_similarity;
use chorus_domain::StatementId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// How a paragraph entered the merged pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolOrigin {
    /// Present in both pools.
    Both,
    /// Only the competitive pass pulled it in.
    CompetitiveOnly,
    /// Only the claim-centric similarity pool pulled it in.
    ClaimCentricOnly,
}

/// Classification of one pooled statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeClass {
    /// At or above the pool mean; kept.
    Core,
    /// Within one sigma below the mean and specifically aligned; kept.
    BoundaryKept,
    /// Within one sigma below the mean but only generically on-topic.
    BoundaryDropped,
    /// Below the floor; rejected.
    Removed,
    /// Kept by classification but from a non-supporter model.
    SupporterFiltered,
}

/// The merge result for one claim.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    /// Pooled paragraphs with their origin tags, by paragraph index.
    pub pool: Vec<(usize, PoolOrigin)>,
    /// Classification of every pooled statement, by statement index.
    pub classes: BTreeMap<usize, MergeClass>,
    /// The persisted evidence set.
    pub canonical: Vec<StatementId>,
}

impl MergeReport {
    /// A report with no pool at all (claim without a centroid).
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Whether a boundary statement is promoted to kept.
///
/// `differential` is the statement's mean similarity to the entire corpus
/// minus its mean similarity to the claim's core set. The test is a strict
/// sign test at exactly zero: equality keeps.
pub fn boundary_promoted(differential: f32) -> bool {
    differential <= 0.0
}

/// Run the mixed-method merge for one claim.
pub fn merge(
    claim_idx: usize,
    centroid: &[f32],
    seed: &ClaimSeed,
    input: &AllocationInput<'_>,
    competitive: &CompetitiveAllocation,
    evidence: &EvidenceField,
) -> MergeReport {
    let mut report = MergeReport::default();
    if input.paragraphs.is_empty() {
        return report;
    }

    // Claim-centric pool: paragraphs whose similarity to the centroid clears
    // mean + sigma of the paragraph similarity distribution.
    let p_sims: Vec<f32> = input
        .paragraph_embeddings
        .iter()
        .map(|e| cosine_similarity(e, centroid))
        .collect();
    let (p_mu, p_sigma) = mean_std(&p_sims);
    let claim_centric: Vec<usize> = (0..input.paragraphs.len())
        .filter(|&i| p_sims[i] > p_mu + p_sigma)
        .collect();

    // Competitive pool: paragraphs owning competitively assigned statements.
    let paragraph_of: Vec<Option<usize>> = input
        .statements
        .iter()
        .map(|s| {
            s.paragraph
                .as_ref()
                .and_then(|pid| input.paragraphs.iter().position(|p| &p.id == pid))
        })
        .collect();
    let mut competitive_pool: Vec<usize> = competitive
        .statements_for(claim_idx)
        .into_iter()
        .filter_map(|s| paragraph_of[s])
        .collect();
    competitive_pool.sort_unstable();
    competitive_pool.dedup();

    for i in 0..input.paragraphs.len() {
        let in_claim_centric = claim_centric.contains(&i);
        let in_competitive = competitive_pool.contains(&i);
        let origin = match (in_competitive, in_claim_centric) {
            (true, true) => PoolOrigin::Both,
            (true, false) => PoolOrigin::CompetitiveOnly,
            (false, true) => PoolOrigin::ClaimCentricOnly,
            (false, false) => continue,
        };
        report.pool.push((i, origin));
    }
    if report.pool.is_empty() {
        return report;
    }

    // Every statement of every pooled paragraph.
    let pooled: Vec<usize> = (0..input.statements.len())
        .filter(|&s| {
            paragraph_of[s].is_some_and(|p| report.pool.iter().any(|&(i, _)| i == p))
        })
        .collect();

    // Pool-wide similarity profile per statement.
    let global_sims: Vec<f32> = pooled
        .iter()
        .map(|&s| mean_similarity_to(s, &pooled, input))
        .collect();
    let (global_mu, global_sigma) = mean_std(&global_sims);

    // The claim's own core set: the continuous pass core when present,
    // otherwise the statements classifying as core here.
    let mut core_classified: Vec<usize> = Vec::new();
    for (&s, &g) in pooled.iter().zip(global_sims.iter()) {
        if g >= global_mu {
            core_classified.push(s);
        }
    }
    let core_set: &[usize] = if evidence.core_sets.get(claim_idx).is_some_and(|c| !c.is_empty()) {
        &evidence.core_sets[claim_idx]
    } else {
        &core_classified
    };

    let all: Vec<usize> = (0..input.statements.len()).collect();
    for (&s, &g) in pooled.iter().zip(global_sims.iter()) {
        let class = if g >= global_mu {
            MergeClass::Core
        } else if g >= global_mu - global_sigma {
            let corpus_sim = mean_similarity_to(s, &all, input);
            let core_sim = mean_similarity_to(s, core_set, input);
            if boundary_promoted(corpus_sim - core_sim) {
                MergeClass::BoundaryKept
            } else {
                MergeClass::BoundaryDropped
            }
        } else {
            MergeClass::Removed
        };
        report.classes.insert(s, class);
    }

    // Supporter filter, then the canonical set.
    for (&s, class) in report.classes.clone().iter() {
        let kept = matches!(class, MergeClass::Core | MergeClass::BoundaryKept);
        if kept {
            if seed.supporters.contains(&input.statements[s].model_index) {
                report.canonical.push(input.statements[s].id.clone());
            } else {
                report.classes.insert(s, MergeClass::SupporterFiltered);
            }
        }
    }

    debug!(
        claim = %seed.id,
        pool = report.pool.len(),
        canonical = report.canonical.len(),
        "merge finished"
    );
    report
}

/// Mean similarity of one statement to a set of statements, excluding itself.
fn mean_similarity_to(statement: usize, set: &[usize], input: &AllocationInput<'_>) -> f32 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &other in set {
        if other == statement {
            continue;
        }
        sum += cosine_similarity(
            &input.statement_embeddings[statement],
            &input.statement_embeddings[other],
        );
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    (mean, variance.sqrt())
}
