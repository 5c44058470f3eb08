//! Chorus Domain Layer
//!
//! This crate contains the core data model for Chorus: the types that flow
//! between the fan-out dispatcher, the evidence-synthesis pipeline, and the
//! external capabilities (providers, embeddings, the claim mapper).
//!
//! ## Key Concepts
//!
//! - **Statement**: an atomic, independently-citable unit of provider text
//! - **Paragraph**: an ordered group of statements, the citation unit the
//!   substrate embeds
//! - **Claim**: a synthesized assertion traceable to the statements that
//!   produced it
//! - **ClaimArtifact**: the per-turn output — claims, edges, tiers, forcing
//!   points, and audit reports
//!
//! ## Architecture
//!
//! Infrastructure implementations live in other crates. This crate defines:
//! - Value types and opaque stable identifiers
//! - Trait interfaces for all external capabilities
//! - The provider error taxonomy shared by dispatch and pipeline layers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod claim;
pub mod embedding;
pub mod error;
pub mod ids;
pub mod statement;
pub mod traits;

// Re-exports for convenience
pub use artifact::{
    AlignmentReport, ClaimArtifact, CompletenessReport, GeometryHealth, PreSemanticSummary,
    RegionCoverage, StatementFate, SubstrateSummary,
};
pub use claim::{Claim, ClaimEdge, Conditional, EdgeKind, ForcingPoint, ForcingPointKind, TierLayer};
pub use embedding::{cosine_similarity, BackendStatus, EmbeddingBackend, HashEmbeddingBackend};
pub use error::ProviderError;
pub use ids::{ClaimId, ParagraphId, ProviderId, RegionId, SessionId, StatementId};
pub use statement::{Paragraph, Statement};
pub use traits::{ChunkSink, ClaimMapper, ContextStore, ProviderAdapter, ProviderReply};
