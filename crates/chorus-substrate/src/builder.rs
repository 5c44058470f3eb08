//! Substrate construction from paragraph embeddings

use crate::basin::{self, BasinOutcome, DegenerateReason};
use crate::config::SubstrateConfig;
use crate::types::{SimilarityEdge, Substrate, SubstrateNode};
use chorus_domain::embedding::cosine_similarity;
use chorus_domain::Paragraph;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from substrate construction.
///
/// A degenerate geometry is not an error; it is a flagged state on the
/// returned substrate.
#[derive(Error, Debug)]
pub enum SubstrateError {
    /// Paragraph and embedding counts differ.
    #[error("embedding count mismatch: {paragraphs} paragraphs, {embeddings} embeddings")]
    CountMismatch {
        /// Number of paragraphs supplied.
        paragraphs: usize,
        /// Number of embeddings supplied.
        embeddings: usize,
    },

    /// Embeddings have inconsistent dimensions.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the first embedding.
        expected: usize,
        /// Offending dimension.
        actual: usize,
    },
}

/// Builds the similarity substrate for one turn.
pub struct SubstrateBuilder {
    config: SubstrateConfig,
}

impl SubstrateBuilder {
    /// Create a builder with explicit tuning.
    pub fn new(config: SubstrateConfig) -> Self {
        Self { config }
    }

    /// Build the substrate over one turn's paragraphs.
    ///
    /// # Errors
    ///
    /// Fails only on malformed input (count or dimension mismatch); weak
    /// geometry is reported on the substrate itself.
    pub fn build(
        &self,
        paragraphs: &[Paragraph],
        embeddings: &[Vec<f32>],
    ) -> Result<Substrate, SubstrateError> {
        if paragraphs.len() != embeddings.len() {
            return Err(SubstrateError::CountMismatch {
                paragraphs: paragraphs.len(),
                embeddings: embeddings.len(),
            });
        }
        if let Some(first) = embeddings.first() {
            for e in embeddings {
                if e.len() != first.len() {
                    return Err(SubstrateError::DimensionMismatch {
                        expected: first.len(),
                        actual: e.len(),
                    });
                }
            }
        }

        let n = paragraphs.len();
        let mut sims = vec![0.0f32; n * n];
        let mut pairwise = Vec::with_capacity(n.saturating_sub(1) * n / 2);
        for i in 0..n {
            sims[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let s = cosine_similarity(&embeddings[i], &embeddings[j]);
                sims[i * n + j] = s;
                sims[j * n + i] = s;
                pairwise.push(s);
            }
        }

        let (mean, std_dev) = basin::mean_std(&pairwise);
        let discrimination = basin::discrimination(&pairwise);
        let basin = if n < 2 {
            BasinOutcome::Degenerate {
                reason: DegenerateReason::InsufficientPairs,
            }
        } else {
            basin::invert(&pairwise, &self.config.basin)
        };
        if basin.is_degenerate() {
            warn!(nodes = n, mean, std_dev, "substrate degenerate, using mean + sigma fallback");
        }

        // Top-k neighbor sets per node, by similarity.
        let k = self.config.k_neighbors;
        let mut top_k: Vec<Vec<usize>> = Vec::with_capacity(n);
        for i in 0..n {
            let mut neighbors: Vec<usize> = (0..n).filter(|&j| j != i).collect();
            neighbors.sort_by(|&a, &b| sims[i * n + b].total_cmp(&sims[i * n + a]));
            neighbors.truncate(k);
            top_k.push(neighbors);
        }

        let mut knn_pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
        let mut mutual_pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
        for i in 0..n {
            for &j in &top_k[i] {
                let pair = (i.min(j), i.max(j));
                knn_pairs.insert(pair);
                if top_k[j].contains(&i) {
                    mutual_pairs.insert(pair);
                }
            }
        }

        let edge = |&(a, b): &(usize, usize)| SimilarityEdge {
            a,
            b,
            similarity: sims[a * n + b],
        };
        let knn_edges: Vec<SimilarityEdge> = knn_pairs.iter().map(edge).collect();
        let mutual_edges: Vec<SimilarityEdge> = mutual_pairs.iter().map(edge).collect();

        let soft = basin.threshold().unwrap_or(mean + std_dev);
        let mut strong_edges = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if sims[i * n + j] > soft {
                    strong_edges.push(SimilarityEdge {
                        a: i,
                        b: j,
                        similarity: sims[i * n + j],
                    });
                }
            }
        }

        let mut nodes = Vec::with_capacity(n);
        for (i, paragraph) in paragraphs.iter().enumerate() {
            let top = top_k[i].first().map_or(0.0, |&j| sims[i * n + j]);
            nodes.push(SubstrateNode {
                paragraph: paragraph.id.clone(),
                model_index: paragraph.model_index,
                top_similarity: top,
                isolation: (1.0 - top).clamp(0.0, 1.0),
                mutual_degree: mutual_edges
                    .iter()
                    .filter(|e| e.a == i || e.b == i)
                    .count(),
                strong_degree: strong_edges
                    .iter()
                    .filter(|e| e.a == i || e.b == i)
                    .count(),
                region: None,
            });
        }

        debug!(
            nodes = n,
            knn = knn_edges.len(),
            mutual = mutual_edges.len(),
            strong = strong_edges.len(),
            degenerate = basin.is_degenerate(),
            "substrate built"
        );

        Ok(Substrate {
            nodes,
            knn_edges,
            mutual_edges,
            strong_edges,
            basin,
            mean,
            std_dev,
            discrimination,
            sims,
        })
    }
}

impl Default for SubstrateBuilder {
    fn default() -> Self {
        Self::new(SubstrateConfig::default())
    }
}
