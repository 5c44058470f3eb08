//! Claims, edges, tiers, and forcing points

use crate::ids::{ClaimId, StatementId};
use serde::{Deserialize, Serialize};

/// Relation type between two claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// The two claims cannot both hold.
    Conflicts,
    /// The source claim lends support to the target.
    Supports,
}

/// A typed, directional relation between two claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimEdge {
    /// Source claim.
    pub from: ClaimId,
    /// Target claim.
    pub to: ClaimId,
    /// Relation type.
    pub kind: EdgeKind,
    /// Optional human-readable question that would disambiguate the relation.
    pub question: Option<String>,
}

/// A conditional branch referencing the claims it affects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    /// Human-readable description of the condition.
    pub description: String,
    /// Claims whose applicability depends on this condition.
    pub affected: Vec<ClaimId>,
    /// Optional question a user could answer to resolve the branch.
    pub question: Option<String>,
}

/// A synthesized assertion traceable to its source statements.
///
/// Claims are created once by the provenance allocator from the mapper's raw
/// claim list plus statement-level evidence; after graph assembly only audit
/// fields are attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Stable identifier.
    pub id: ClaimId,

    /// The assertion text as labeled by the mapper.
    pub label: String,

    /// The persisted evidence set: ids of the statements that support this
    /// claim after the mixed-method merge.
    pub canonical_statement_ids: Vec<StatementId>,

    /// Model indices that support this claim.
    pub supporters: Vec<usize>,

    /// Fraction of the turn's models that support this claim.
    pub support_ratio: f64,

    /// Provenance weight: total competitive allocation mass received.
    pub bulk: f64,

    /// Tier index assigned by the graph assembler.
    pub tier: Option<usize>,

    /// Outgoing conflict/support edges.
    pub edges: Vec<ClaimEdge>,
}

impl Claim {
    /// Whether any outgoing edge is a conflict.
    pub fn has_conflict(&self) -> bool {
        self.edges.iter().any(|e| e.kind == EdgeKind::Conflicts)
    }
}

/// What kind of decision a forcing point represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcingPointKind {
    /// Derived from a conflict edge between two claims.
    Conflict,
    /// Derived from a conditional branch.
    Conditional,
}

/// A derived interactive decision node in the claim graph.
///
/// Consumed by an external traversal UI; never mutated by the core after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcingPoint {
    /// Stable identifier (`f{n}` in derivation order).
    pub id: String,
    /// Decision kind.
    pub kind: ForcingPointKind,
    /// Claims this decision affects.
    pub claims: Vec<ClaimId>,
    /// The question to put to the user.
    pub question: String,
    /// Minimal statement evidence explaining the branch.
    pub justification: Vec<StatementId>,
}

/// One tier of the claim graph: tier 0 is the conflict-free foundation,
/// subsequent tiers are conflict components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierLayer {
    /// Tier index.
    pub index: usize,
    /// Member claims.
    pub claim_ids: Vec<ClaimId>,
    /// Indices into the artifact's conditional list that attach here.
    pub conditionals: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(id: usize, edges: Vec<ClaimEdge>) -> Claim {
        Claim {
            id: ClaimId::derive(id),
            label: format!("claim {}", id),
            canonical_statement_ids: Vec::new(),
            supporters: vec![0],
            support_ratio: 0.5,
            bulk: 1.0,
            tier: None,
            edges,
        }
    }

    #[test]
    fn test_has_conflict() {
        let edge = ClaimEdge {
            from: ClaimId::derive(0),
            to: ClaimId::derive(1),
            kind: EdgeKind::Conflicts,
            question: None,
        };
        assert!(claim(0, vec![edge]).has_conflict());
        assert!(!claim(1, Vec::new()).has_conflict());
    }

    #[test]
    fn test_edge_kind_serde_names() {
        let json = serde_json::to_string(&EdgeKind::Conflicts).unwrap();
        assert_eq!(json, "\"conflicts\"");
        let json = serde_json::to_string(&EdgeKind::Supports).unwrap();
        assert_eq!(json, "\"supports\"");
    }
}
