//! Continuous evidence field
//!
//! Unthresholded scoring: every statement gets an evidence score for every
//! claim, `z_claim + z_core`. Used downstream to detect statements the
//! competitive pass wrongly excluded; nothing is filtered here.

use chorus_domain::embedding::cosine_similarity;

/// The full statement-by-claim evidence field.
#[derive(Debug, Clone, Default)]
pub struct EvidenceField {
    /// `scores[claim][statement] = z_claim + z_core`. Claims without a
    /// centroid score zero everywhere.
    pub scores: Vec<Vec<f32>>,
    /// Per claim, the statement indices whose `z_claim` cleared the core
    /// threshold.
    pub core_sets: Vec<Vec<usize>>,
}

impl EvidenceField {
    /// Evidence score of one statement for one claim.
    pub fn score(&self, claim: usize, statement: usize) -> f32 {
        self.scores[claim][statement]
    }
}

/// Compute the evidence field for every claim.
pub fn field(
    centroids: &[Option<Vec<f32>>],
    statement_embeddings: &[Vec<f32>],
    core_z: f32,
) -> EvidenceField {
    let n = statement_embeddings.len();
    let mut scores = Vec::with_capacity(centroids.len());
    let mut core_sets = Vec::with_capacity(centroids.len());

    for centroid in centroids {
        let Some(centroid) = centroid else {
            scores.push(vec![0.0; n]);
            core_sets.push(Vec::new());
            continue;
        };

        let sims: Vec<f32> = statement_embeddings
            .iter()
            .map(|e| cosine_similarity(e, centroid))
            .collect();
        let z_claim = standardize(&sims);

        let core: Vec<usize> = z_claim
            .iter()
            .enumerate()
            .filter(|&(_, z)| *z > core_z)
            .map(|(i, _)| i)
            .collect();

        // Mean similarity of each statement to the claim's core set, itself
        // standardized.
        let core_sims: Vec<f32> = statement_embeddings
            .iter()
            .map(|e| {
                if core.is_empty() {
                    0.0
                } else {
                    core.iter()
                        .map(|&c| cosine_similarity(e, &statement_embeddings[c]))
                        .sum::<f32>()
                        / core.len() as f32
                }
            })
            .collect();
        let z_core = standardize(&core_sims);

        scores.push(
            z_claim
                .iter()
                .zip(z_core.iter())
                .map(|(a, b)| a + b)
                .collect(),
        );
        core_sets.push(core);
    }

    EvidenceField { scores, core_sets }
}

/// z-scores of a sample; all zeros when the variance vanishes.
fn standardize(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    let std_dev = variance.sqrt();
    if std_dev < 1e-6 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std_dev).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_statement_scores_for_every_claim() {
        let centroids = vec![Some(vec![1.0, 0.0]), Some(vec![0.0, 1.0])];
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.1, 0.9],
            vec![0.0, 1.0],
        ];
        let field = field(&centroids, &embeddings, 1.0);

        assert_eq!(field.scores.len(), 2);
        for claim_scores in &field.scores {
            assert_eq!(claim_scores.len(), 4);
        }
        // Statements near a centroid outscore those far from it.
        assert!(field.score(0, 0) > field.score(0, 3));
        assert!(field.score(1, 3) > field.score(1, 0));
    }

    #[test]
    fn test_core_set_is_high_z_only() {
        let centroids = vec![Some(vec![1.0, 0.0])];
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![0.99, 0.05],
            vec![0.0, 1.0],
            vec![0.05, 0.99],
            vec![-0.5, 0.5],
        ];
        let field = field(&centroids, &embeddings, 1.0);

        for &i in &field.core_sets[0] {
            // Core members are the statements aligned with the centroid.
            assert!(i < 2, "statement {} should not be core", i);
        }
        assert!(!field.core_sets[0].is_empty());
    }

    #[test]
    fn test_missing_centroid_scores_zero() {
        let centroids = vec![None];
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let field = field(&centroids, &embeddings, 1.0);
        assert_eq!(field.scores[0], vec![0.0, 0.0]);
        assert!(field.core_sets[0].is_empty());
    }

    #[test]
    fn test_zero_variance_standardizes_to_zero() {
        assert_eq!(standardize(&[0.5, 0.5, 0.5]), vec![0.0, 0.0, 0.0]);
    }
}
