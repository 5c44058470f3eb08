//! Mutual-graph clustering
//!
//! Connected components over the mutual graph become regions. Clustering is
//! an enrichment, not a prerequisite: it never aborts a turn, and a substrate
//! with no mutual edges simply yields singleton clusters, all uncertain.

use crate::config::ClusterConfig;
use crate::types::Substrate;
use chorus_domain::RegionId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One region of the substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Derived region id, ordered by first member.
    pub region: RegionId,
    /// Member node indices, ascending.
    pub members: Vec<usize>,
    /// Mean pairwise similarity among members (0 for singletons).
    pub cohesion: f32,
    /// Small or low-cohesion clusters are uncertain.
    pub uncertain: bool,
}

/// Group substrate nodes into clusters over the mutual graph.
pub fn cluster(substrate: &Substrate, config: &ClusterConfig) -> Vec<Cluster> {
    let n = substrate.nodes.len();
    if n == 0 {
        return Vec::new();
    }

    let mut parent: Vec<usize> = (0..n).collect();
    for edge in &substrate.mutual_edges {
        union(&mut parent, edge.a, edge.b);
    }

    // Components keyed by root, members in ascending node order.
    let mut components: Vec<(usize, Vec<usize>)> = Vec::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        match components.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(i),
            None => components.push((root, vec![i])),
        }
    }
    components.sort_by_key(|(_, members)| members[0]);

    let cohesion_floor = config.min_cohesion.unwrap_or_else(|| substrate.soft_threshold());
    let clusters: Vec<Cluster> = components
        .into_iter()
        .enumerate()
        .map(|(ordinal, (_, members))| {
            let cohesion = mean_pairwise(substrate, &members);
            let uncertain = members.len() < config.min_size || cohesion < cohesion_floor;
            Cluster {
                region: RegionId::derive(ordinal),
                members,
                cohesion,
                uncertain,
            }
        })
        .collect();

    debug!(
        nodes = n,
        clusters = clusters.len(),
        uncertain = clusters.iter().filter(|c| c.uncertain).count(),
        "clustering finished"
    );
    clusters
}

/// Write each cluster's region id onto its member nodes.
pub fn assign_regions(substrate: &mut Substrate, clusters: &[Cluster]) {
    for cluster in clusters {
        for &i in &cluster.members {
            substrate.nodes[i].region = Some(cluster.region.clone());
        }
    }
}

fn mean_pairwise(substrate: &Substrate, members: &[usize]) -> f32 {
    if members.len() < 2 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for (idx, &a) in members.iter().enumerate() {
        for &b in &members[idx + 1..] {
            sum += substrate.similarity(a, b);
            pairs += 1;
        }
    }
    sum / pairs as f32
}

fn find(parent: &mut Vec<usize>, i: usize) -> usize {
    let mut root = i;
    while parent[root] != root {
        root = parent[root];
    }
    // Path compression.
    let mut cur = i;
    while parent[cur] != root {
        let next = parent[cur];
        parent[cur] = root;
        cur = next;
    }
    root
}

fn union(parent: &mut Vec<usize>, a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[rb.max(ra)] = rb.min(ra);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SubstrateBuilder;
    use crate::config::SubstrateConfig;
    use chorus_domain::{Paragraph, ParagraphId};

    fn substrate_with_two_groups() -> Substrate {
        let mut paragraphs = Vec::new();
        let mut embeddings = Vec::new();
        for i in 0..4 {
            paragraphs.push(Paragraph {
                id: ParagraphId::derive(0, i),
                model_index: 0,
                statement_ids: Vec::new(),
                text: String::new(),
            });
            embeddings.push(vec![1.0, 0.01 * i as f32, 0.0]);
        }
        for i in 0..4 {
            paragraphs.push(Paragraph {
                id: ParagraphId::derive(1, i),
                model_index: 1,
                statement_ids: Vec::new(),
                text: String::new(),
            });
            embeddings.push(vec![0.0, 0.01 * i as f32, 1.0]);
        }
        SubstrateBuilder::new(SubstrateConfig {
            k_neighbors: 2,
            ..SubstrateConfig::default()
        })
        .build(&paragraphs, &embeddings)
        .unwrap()
    }

    #[test]
    fn test_two_groups_become_two_clusters() {
        let substrate = substrate_with_two_groups();
        let clusters = cluster(&substrate, &ClusterConfig::default());

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![0, 1, 2, 3]);
        assert_eq!(clusters[1].members, vec![4, 5, 6, 7]);
        assert_eq!(clusters[0].region.as_str(), "r0");
        assert_eq!(clusters[1].region.as_str(), "r1");
    }

    #[test]
    fn test_tight_clusters_are_certain() {
        let substrate = substrate_with_two_groups();
        let clusters = cluster(&substrate, &ClusterConfig::default());
        for c in &clusters {
            assert!(c.cohesion > 0.99);
            assert!(!c.uncertain, "tight cluster flagged uncertain: {:?}", c);
        }
    }

    #[test]
    fn test_singletons_are_uncertain() {
        let substrate = substrate_with_two_groups();
        let clusters = cluster(
            &substrate,
            &ClusterConfig {
                min_size: 5,
                min_cohesion: None,
            },
        );
        for c in &clusters {
            assert!(c.uncertain);
        }
    }

    #[test]
    fn test_empty_substrate_yields_empty_set() {
        let substrate = SubstrateBuilder::default().build(&[], &[]).unwrap();
        assert!(cluster(&substrate, &ClusterConfig::default()).is_empty());
    }

    #[test]
    fn test_assign_regions() {
        let mut substrate = substrate_with_two_groups();
        let clusters = cluster(&substrate, &ClusterConfig::default());
        assign_regions(&mut substrate, &clusters);

        assert_eq!(substrate.nodes[0].region, Some(RegionId::derive(0)));
        assert_eq!(substrate.nodes[7].region, Some(RegionId::derive(1)));
    }

    #[test]
    fn test_clusters_are_deterministic() {
        let substrate = substrate_with_two_groups();
        let a = cluster(&substrate, &ClusterConfig::default());
        let b = cluster(&substrate, &ClusterConfig::default());
        assert_eq!(a, b);
    }
}
