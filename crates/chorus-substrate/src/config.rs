//! Substrate tuning knobs

use serde::{Deserialize, Serialize};

/// Configuration for the substrate builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstrateConfig {
    /// Fixed fan-out of the k-nearest-neighbor graph.
    pub k_neighbors: usize,

    /// Basin-inversion parameters.
    pub basin: BasinConfig,
}

impl Default for SubstrateConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 4,
            basin: BasinConfig::default(),
        }
    }
}

/// Configuration for basin inversion.
///
/// The smoothing bandwidth is configurable rather than fixed: narrow windows
/// resolve close modes but admit noise valleys, wide windows the reverse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasinConfig {
    /// Number of histogram bins over the similarity range.
    pub bins: usize,

    /// Moving-average smoothing radius, in bins.
    pub smoothing_window: usize,

    /// Minimum valley depth, in standard deviations of the smoothed bin
    /// counts. Shallower valleys are treated as noise and the substrate is
    /// reported degenerate.
    pub min_depth_sigma: f32,

    /// Minimum valley depth as a fraction of the lower flanking peak.
    pub min_depth_ratio: f32,

    /// Minimum number of pairwise similarities for inversion to be attempted.
    pub min_pairs: usize,
}

impl Default for BasinConfig {
    fn default() -> Self {
        Self {
            bins: 40,
            smoothing_window: 2,
            min_depth_sigma: 0.5,
            min_depth_ratio: 0.5,
            min_pairs: 8,
        }
    }
}

/// Configuration for the clustering engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Components smaller than this are marked uncertain.
    pub min_size: usize,

    /// Cohesion floor below which a cluster is marked uncertain. When absent
    /// the substrate's soft threshold is used.
    pub min_cohesion: Option<f32>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            min_size: 2,
            min_cohesion: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SubstrateConfig::default();
        assert_eq!(config.k_neighbors, 4);
        assert_eq!(config.basin.bins, 40);
        assert_eq!(config.basin.smoothing_window, 2);
    }

    #[test]
    fn test_serde_round_trip() {
        let config = SubstrateConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: SubstrateConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.k_neighbors, config.k_neighbors);
        assert_eq!(back.basin.min_pairs, config.basin.min_pairs);
    }
}
