//! Competitive allocation
//!
//! Sparse, high-precision assignment: a statement goes only to claims whose
//! similarity clears a per-statement threshold derived from the competing
//! claims' own similarity distribution, weighted by normalized excess. The
//! weights for one statement always sum to 1.0 across its assigned claims.

use chorus_domain::embedding::cosine_similarity;
use chorus_domain::Statement;
use std::collections::BTreeMap;

/// One (claim, weight) assignment for a statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    /// Index of the claim in seed order.
    pub claim: usize,
    /// Similarity of the statement to the claim centroid.
    pub similarity: f32,
    /// Normalized excess weight; sums to 1.0 per statement.
    pub weight: f64,
}

/// Result of the competitive pass.
#[derive(Debug, Clone, Default)]
pub struct CompetitiveAllocation {
    /// Assignments keyed by statement index.
    pub assignments: BTreeMap<usize, Vec<Assignment>>,
}

impl CompetitiveAllocation {
    /// Whether a statement was competitively assigned to a claim.
    pub fn is_assigned(&self, statement: usize, claim: usize) -> bool {
        self.assignments
            .get(&statement)
            .is_some_and(|a| a.iter().any(|x| x.claim == claim))
    }

    /// Statement indices assigned to one claim.
    pub fn statements_for(&self, claim: usize) -> Vec<usize> {
        self.assignments
            .iter()
            .filter(|(_, a)| a.iter().any(|x| x.claim == claim))
            .map(|(&s, _)| s)
            .collect()
    }

    /// Total allocation mass one claim received (the claim's "bulk").
    pub fn claim_mass(&self, claim: usize) -> f64 {
        self.assignments
            .values()
            .flatten()
            .filter(|a| a.claim == claim)
            .map(|a| a.weight)
            .sum()
    }
}

/// Run the competitive pass over every statement.
///
/// Claims without a centroid never receive assignments.
pub fn allocate(
    centroids: &[Option<Vec<f32>>],
    statement_embeddings: &[Vec<f32>],
    statements: &[Statement],
) -> CompetitiveAllocation {
    let live: Vec<(usize, &[f32])> = centroids
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.as_ref().map(|v| (i, v.as_slice())))
        .collect();
    let mut allocation = CompetitiveAllocation::default();
    if live.is_empty() {
        return allocation;
    }

    // Mean similarity across all (statement, claim) pairs; threshold for the
    // uncontested single-claim case, where a per-statement spread does not
    // exist.
    let mut all_sims: Vec<f32> = Vec::new();
    let mut sims_per_statement: Vec<Vec<(usize, f32)>> = Vec::with_capacity(statements.len());
    for embedding in statement_embeddings {
        let sims: Vec<(usize, f32)> = live
            .iter()
            .map(|&(c, centroid)| {
                let s = cosine_similarity(embedding, centroid);
                all_sims.push(s);
                (c, s)
            })
            .collect();
        sims_per_statement.push(sims);
    }
    let global_mean = if all_sims.is_empty() {
        0.0
    } else {
        all_sims.iter().sum::<f32>() / all_sims.len() as f32
    };

    for (statement_idx, sims) in sims_per_statement.iter().enumerate() {
        let assignments = if live.len() == 1 {
            let (claim, sim) = sims[0];
            if sim > global_mean {
                vec![Assignment {
                    claim,
                    similarity: sim,
                    weight: 1.0,
                }]
            } else {
                Vec::new()
            }
        } else {
            let values: Vec<f32> = sims.iter().map(|&(_, s)| s).collect();
            let mean = values.iter().sum::<f32>() / values.len() as f32;
            let tau = if live.len() == 2 {
                mean
            } else {
                let variance =
                    values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32;
                mean + variance.sqrt()
            };
            weighted_by_excess(sims, tau)
        };

        if !assignments.is_empty() {
            allocation.assignments.insert(statement_idx, assignments);
        }
    }

    allocation
}

/// Assign to every claim whose similarity clears `tau`, weighted by
/// normalized excess.
pub fn weighted_by_excess(sims: &[(usize, f32)], tau: f32) -> Vec<Assignment> {
    let winners: Vec<(usize, f32, f64)> = sims
        .iter()
        .filter(|&&(_, s)| s > tau)
        .map(|&(c, s)| (c, s, (s - tau) as f64))
        .collect();
    normalize_excess(&winners)
}

/// Turn per-claim `(claim, similarity, excess)` triples into weights that
/// sum to 1.0.
pub fn normalize_excess(winners: &[(usize, f32, f64)]) -> Vec<Assignment> {
    let total: f64 = winners.iter().map(|&(_, _, e)| e).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    winners
        .iter()
        .map(|&(claim, similarity, excess)| Assignment {
            claim,
            similarity,
            weight: excess / total,
        })
        .collect()
}
