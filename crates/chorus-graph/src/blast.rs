//! Blast-radius scoring
//!
//! Composite importance per claim: how much the overall answer would change
//! if the claim were removed. Five weighted geometric components, then three
//! multiplicative policy modifiers in a fixed order, then the survey gate.

use chorus_domain::{Claim, ClaimId, Conditional, EdgeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Blast-radius weights and policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlastConfig {
    /// Weight of cascade breadth.
    pub cascade_weight: f64,
    /// Weight of the exclusive-evidence fraction.
    pub exclusive_weight: f64,
    /// Weight of structural leverage.
    pub leverage_weight: f64,
    /// Weight of query relevance.
    pub relevance_weight: f64,
    /// Weight of the articulation-point flag.
    pub articulation_weight: f64,

    /// Consensus discount strength; the discount factor is
    /// `1 - consensus_discount * support_ratio`.
    pub consensus_discount: f64,
    /// Multiplier for sole-source claims off the query topic.
    pub sole_source_penalty: f64,
    /// Relevance below which a sole-source claim counts as off-topic.
    pub sole_source_relevance_floor: f64,
    /// Jaccard similarity above which two claims' evidence is redundant.
    pub redundancy_jaccard: f64,
    /// Maximum redundancy discount applied to the lower scorer.
    pub redundancy_max_discount: f64,

    /// Claims below this post-modifier composite never become survey axes.
    pub gate: f64,
    /// Maximum number of axes.
    pub max_axes: usize,
    /// Mean support ratio at or above which consensus counts as high.
    pub high_consensus: f64,
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            cascade_weight: 0.30,
            exclusive_weight: 0.25,
            leverage_weight: 0.20,
            relevance_weight: 0.15,
            articulation_weight: 0.10,
            consensus_discount: 0.30,
            sole_source_penalty: 0.50,
            sole_source_relevance_floor: 0.30,
            redundancy_jaccard: 0.5,
            redundancy_max_discount: 0.40,
            gate: 0.20,
            max_axes: 3,
            high_consensus: 0.9,
        }
    }
}

/// The scored components for one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastScore {
    /// The scored claim.
    pub claim: ClaimId,
    /// Fraction of other claims reachable through edges and shared
    /// conditionals.
    pub cascade: f64,
    /// Fraction of canonical evidence no other claim cites.
    pub exclusive: f64,
    /// Degree in the claim graph, normalized by the maximum degree.
    pub leverage: f64,
    /// Relevance of the claim to the user query.
    pub relevance: f64,
    /// Whether removing the claim disconnects the graph.
    pub articulation: bool,
    /// Weighted sum after all policy modifiers.
    pub composite: f64,
}

/// Score every claim and pick the survey axes.
///
/// `relevance` is one query-relevance value per claim, aligned by index.
/// Returns the scores and the gated axes (at most `max_axes`).
pub fn score_claims(
    claims: &[Claim],
    conditionals: &[Conditional],
    relevance: &[f64],
    config: &BlastConfig,
) -> (Vec<BlastScore>, Vec<ClaimId>) {
    let n = claims.len();
    let adjacency = adjacency(claims, conditionals);
    let degrees: Vec<usize> = adjacency.iter().map(|a| a.len()).collect();
    let max_degree = degrees.iter().copied().max().unwrap_or(0);

    let mut scores: Vec<BlastScore> = (0..n)
        .map(|i| {
            let cascade = if n <= 1 {
                0.0
            } else {
                (reachable_from(i, &adjacency).len() - 1) as f64 / (n - 1) as f64
            };
            let exclusive = exclusive_fraction(i, claims);
            let leverage = if max_degree == 0 {
                0.0
            } else {
                degrees[i] as f64 / max_degree as f64
            };
            let rel = relevance.get(i).copied().unwrap_or(0.0);
            let articulation = is_articulation(i, &adjacency);

            let mut composite = config.cascade_weight * cascade
                + config.exclusive_weight * exclusive
                + config.leverage_weight * leverage
                + config.relevance_weight * rel
                + config.articulation_weight * if articulation { 1.0 } else { 0.0 };

            // Modifier 1: consensus discount, non-increasing in support.
            composite *= 1.0 - config.consensus_discount * claims[i].support_ratio.clamp(0.0, 1.0);
            // Modifier 2: sole-source off-topic penalty.
            if claims[i].supporters.len() == 1 && rel < config.sole_source_relevance_floor {
                composite *= config.sole_source_penalty;
            }

            BlastScore {
                claim: claims[i].id.clone(),
                cascade,
                exclusive,
                leverage,
                relevance: rel,
                articulation,
                composite,
            }
        })
        .collect();

    // Modifier 3: pairwise redundancy, discounting the lower scorer.
    for i in 0..n {
        for j in (i + 1)..n {
            let jaccard = jaccard(&claims[i], &claims[j]);
            if jaccard > config.redundancy_jaccard {
                let ramp = (jaccard - config.redundancy_jaccard)
                    / (1.0 - config.redundancy_jaccard);
                let factor = 1.0 - config.redundancy_max_discount * ramp;
                let lower = if scores[i].composite <= scores[j].composite { i } else { j };
                scores[lower].composite *= factor;
            }
        }
    }

    let mut ranked: Vec<usize> = (0..n).collect();
    ranked.sort_by(|&a, &b| scores[b].composite.total_cmp(&scores[a].composite));
    let axes: Vec<ClaimId> = ranked
        .into_iter()
        .filter(|&i| scores[i].composite >= config.gate)
        .take(config.max_axes)
        .map(|i| scores[i].claim.clone())
        .collect();

    debug!(claims = n, axes = axes.len(), "blast radius scored");
    (scores, axes)
}

/// Whether the survey step should be skipped entirely: aggregate consensus
/// is high and no conflicts exist.
pub fn survey_skippable(claims: &[Claim], config: &BlastConfig) -> bool {
    if claims.is_empty() {
        return true;
    }
    let mean_support =
        claims.iter().map(|c| c.support_ratio).sum::<f64>() / claims.len() as f64;
    let any_conflict = claims.iter().any(|c| c.has_conflict());
    mean_support >= config.high_consensus && !any_conflict
}

/// Undirected adjacency over claim edges plus shared conditionals.
fn adjacency(claims: &[Claim], conditionals: &[Conditional]) -> Vec<BTreeSet<usize>> {
    let n = claims.len();
    let index_of = |id: &ClaimId| claims.iter().position(|c| &c.id == id);
    let mut adjacency = vec![BTreeSet::new(); n];

    for (i, claim) in claims.iter().enumerate() {
        for edge in &claim.edges {
            if edge.kind == EdgeKind::Conflicts || edge.kind == EdgeKind::Supports {
                if let Some(j) = index_of(&edge.to) {
                    if i != j {
                        adjacency[i].insert(j);
                        adjacency[j].insert(i);
                    }
                }
            }
        }
    }
    for conditional in conditionals {
        let members: Vec<usize> = conditional.affected.iter().filter_map(index_of).collect();
        for (a, &i) in members.iter().enumerate() {
            for &j in &members[a + 1..] {
                adjacency[i].insert(j);
                adjacency[j].insert(i);
            }
        }
    }
    adjacency
}

fn reachable_from(start: usize, adjacency: &[BTreeSet<usize>]) -> BTreeSet<usize> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![start];
    while let Some(i) = stack.pop() {
        if seen.insert(i) {
            stack.extend(adjacency[i].iter().copied());
        }
    }
    seen
}

/// Fraction of the claim's canonical statements cited by no other claim.
fn exclusive_fraction(i: usize, claims: &[Claim]) -> f64 {
    let own = &claims[i].canonical_statement_ids;
    if own.is_empty() {
        return 0.0;
    }
    let exclusive = own
        .iter()
        .filter(|sid| {
            !claims
                .iter()
                .enumerate()
                .any(|(j, c)| j != i && c.canonical_statement_ids.contains(sid))
        })
        .count();
    exclusive as f64 / own.len() as f64
}

/// Removal-based articulation check: does deleting the node split its
/// connected component?
fn is_articulation(i: usize, adjacency: &[BTreeSet<usize>]) -> bool {
    let neighbors: Vec<usize> = adjacency[i].iter().copied().collect();
    if neighbors.len() < 2 {
        return false;
    }
    // Walk from one neighbor with `i` removed; any neighbor left unreached
    // means `i` was the only path.
    let mut seen = BTreeSet::new();
    seen.insert(i);
    let mut stack = vec![neighbors[0]];
    while let Some(j) = stack.pop() {
        if seen.insert(j) {
            stack.extend(adjacency[j].iter().filter(|k| !seen.contains(k)));
        }
    }
    neighbors.iter().any(|n| !seen.contains(n))
}

fn jaccard(a: &Claim, b: &Claim) -> f64 {
    let sa: BTreeSet<_> = a.canonical_statement_ids.iter().collect();
    let sb: BTreeSet<_> = b.canonical_statement_ids.iter().collect();
    if sa.is_empty() && sb.is_empty() {
        return 0.0;
    }
    let intersection = sa.intersection(&sb).count() as f64;
    let union = sa.union(&sb).count() as f64;
    intersection / union
}
