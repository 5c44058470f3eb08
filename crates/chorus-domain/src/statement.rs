//! Statements and paragraphs - the units of evidence
//!
//! A statement is the atomic unit the allocator assigns to claims; a
//! paragraph is the citation unit the substrate embeds. Every statement
//! belongs to exactly one paragraph and every paragraph to exactly one
//! model's output.

use crate::ids::{ParagraphId, StatementId};
use serde::{Deserialize, Serialize};

/// An atomic unit of evidence extracted from one provider's answer.
///
/// Statements are created in batch from one extraction pass over all provider
/// outputs for a turn and are immutable afterwards, except that the substrate
/// stage attaches geometric coordinates (paragraph membership is set by the
/// projector, top similarity by the substrate builder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Stable derived identifier.
    pub id: StatementId,

    /// Index of the source model in the turn's provider result set.
    pub model_index: usize,

    /// The raw statement text.
    pub text: String,

    /// Paragraph this statement belongs to (set by the projector).
    pub paragraph: Option<ParagraphId>,

    /// Highest similarity of the owning paragraph to any other paragraph
    /// (set by the substrate builder).
    pub top_similarity: Option<f32>,
}

impl Statement {
    /// Create a statement with no geometric coordinates attached yet.
    pub fn new(id: StatementId, model_index: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            model_index,
            text: text.into(),
            paragraph: None,
            top_similarity: None,
        }
    }
}

/// An ordered group of statements forming one citation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Stable derived identifier.
    pub id: ParagraphId,

    /// Index of the source model in the turn's provider result set.
    pub model_index: usize,

    /// Member statements in source order.
    pub statement_ids: Vec<StatementId>,

    /// Concatenated original text of the member statements.
    pub text: String,
}

impl Paragraph {
    /// Number of member statements.
    pub fn len(&self) -> usize {
        self.statement_ids.len()
    }

    /// Whether the paragraph has no member statements.
    pub fn is_empty(&self) -> bool {
        self.statement_ids.is_empty()
    }
}
