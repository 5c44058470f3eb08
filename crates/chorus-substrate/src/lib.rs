//! Chorus Embedding Substrate
//!
//! Geometric reasoning over paragraph embeddings: similarity graphs, the
//! basin-inversion threshold discovery, and mutual-graph clustering.
//!
//! # Architecture
//!
//! - `builder`: pairwise cosine similarities, k-NN / mutual / strong edges,
//!   per-node statistics
//! - `basin`: self-calibrating valley threshold over the similarity
//!   distribution, with explicit degenerate states
//! - `cluster`: connected components over the mutual graph with cohesion
//!   scoring
//!
//! Different conversations produce embeddings of very different absolute
//! scale, so no fixed similarity cutoff appears anywhere in this crate: every
//! threshold is discovered from the turn's own distribution, and consumers
//! must check the degenerate flag before trusting one.

#![warn(missing_docs)]

pub mod basin;
pub mod builder;
pub mod cluster;
pub mod config;
pub mod types;

pub use basin::{BasinOutcome, DegenerateReason};
pub use builder::{SubstrateBuilder, SubstrateError};
pub use cluster::{assign_regions, cluster, Cluster};
pub use config::{BasinConfig, ClusterConfig, SubstrateConfig};
pub use types::{SimilarityEdge, Substrate, SubstrateNode};
