//! Substrate data structures

use crate::basin::BasinOutcome;
use chorus_domain::{GeometryHealth, ParagraphId, RegionId, SubstrateSummary};
use serde::{Deserialize, Serialize};

/// One undirected similarity edge between two substrate nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    /// Lower node index.
    pub a: usize,
    /// Higher node index.
    pub b: usize,
    /// Cosine similarity of the endpoints.
    pub similarity: f32,
}

/// One paragraph embedded into the similarity space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateNode {
    /// The embedded paragraph.
    pub paragraph: ParagraphId,
    /// Source model of the paragraph.
    pub model_index: usize,
    /// Similarity to the closest other node (0 when alone).
    pub top_similarity: f32,
    /// How far the node sits from everything else (`1 - top_similarity`).
    pub isolation: f32,
    /// Degree in the mutual graph.
    pub mutual_degree: usize,
    /// Degree in the strong graph.
    pub strong_degree: usize,
    /// Region assigned by the clustering engine.
    pub region: Option<RegionId>,
}

/// The embedding-space graph for one turn.
///
/// Owns the three edge sets and the discovered valley threshold. Consumers
/// must check [`Substrate::is_degenerate`] before trusting the valley; the
/// [`Substrate::soft_threshold`] accessor already applies the fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Substrate {
    /// Embedded paragraphs, in paragraph order.
    pub nodes: Vec<SubstrateNode>,
    /// k-nearest-neighbor edges.
    pub knn_edges: Vec<SimilarityEdge>,
    /// Edges where both endpoints rank each other in their top-k.
    pub mutual_edges: Vec<SimilarityEdge>,
    /// Edges above the soft threshold.
    pub strong_edges: Vec<SimilarityEdge>,
    /// Result of basin inversion over the pairwise distribution.
    pub basin: BasinOutcome,
    /// Mean pairwise similarity.
    pub mean: f32,
    /// Standard deviation of pairwise similarity.
    pub std_dev: f32,
    /// Discrimination range `P90 - P10`.
    pub discrimination: f32,
    /// Dense pairwise similarity matrix, row-major.
    pub(crate) sims: Vec<f32>,
}

impl Substrate {
    /// Cosine similarity between two nodes.
    pub fn similarity(&self, a: usize, b: usize) -> f32 {
        self.sims[a * self.nodes.len() + b]
    }

    /// Whether basin inversion failed to find a usable valley.
    pub fn is_degenerate(&self) -> bool {
        self.basin.is_degenerate()
    }

    /// The discovered valley threshold, or the `mean + std_dev` fallback when
    /// the substrate is degenerate.
    pub fn soft_threshold(&self) -> f32 {
        self.basin.threshold().unwrap_or(self.mean + self.std_dev)
    }

    /// Health band of the geometry.
    pub fn geometry(&self) -> GeometryHealth {
        GeometryHealth::from_discrimination(self.discrimination)
    }

    /// Node index of a paragraph, if embedded.
    pub fn node_index(&self, paragraph: &ParagraphId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.paragraph == paragraph)
    }

    /// Summary attached to the claim artifact.
    pub fn summary(&self, region_count: usize) -> SubstrateSummary {
        SubstrateSummary {
            node_count: self.nodes.len(),
            valley: self.basin.threshold(),
            mean: self.mean,
            std_dev: self.std_dev,
            discrimination: self.discrimination,
            degenerate: self.is_degenerate(),
            geometry: self.geometry(),
            region_count,
        }
    }
}
