//! Chorus Statement Extraction
//!
//! Deterministic conversion of raw provider answers into atomic statements
//! and paragraph-sized citation units. No model calls, no I/O: the same
//! input text always yields the same ids and groupings, which downstream
//! stages persist and re-reference across turns.
//!
//! # Architecture
//!
//! - `splitter`: splits one text into blocks and blocks into statement-sized
//!   units along structural boundaries
//! - the extractor in this module assigns stable derived ids and projects
//!   statements back into paragraphs
//!
//! # Examples
//!
//! ```
//! use chorus_extractor::StatementExtractor;
//!
//! let extractor = StatementExtractor::default();
//! let extraction = extractor.extract_all(&[
//!     "Water boils at 100C. This varies with altitude.".to_string(),
//! ]);
//! assert_eq!(extraction.statements.len(), 2);
//! assert_eq!(extraction.paragraphs.len(), 1);
//! ```

#![warn(missing_docs)]

pub mod splitter;

use chorus_domain::{Paragraph, ParagraphId, Statement, StatementId};
use serde::{Deserialize, Serialize};
use splitter::split_blocks;
use tracing::debug;

/// Extraction tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Units shorter than this (after trimming and marker stripping) are
    /// dropped as noise fragments.
    pub min_statement_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_statement_chars: 2,
        }
    }
}

/// The result of one extraction pass over a turn's provider outputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
    /// Every statement, in (model, source) order.
    pub statements: Vec<Statement>,
    /// Every paragraph, in (model, source) order.
    pub paragraphs: Vec<Paragraph>,
}

impl Extraction {
    /// Statements belonging to one model, in source order.
    pub fn statements_for_model(&self, model_index: usize) -> Vec<&Statement> {
        self.statements
            .iter()
            .filter(|s| s.model_index == model_index)
            .collect()
    }
}

/// Splits provider answers into statements and projects them into paragraphs.
#[derive(Debug, Clone, Default)]
pub struct StatementExtractor {
    config: ExtractorConfig,
}

impl StatementExtractor {
    /// Create an extractor with explicit tuning.
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Extract statements and paragraphs from every provider text in a turn.
    ///
    /// The position of each text in the slice is its model index.
    pub fn extract_all(&self, texts: &[String]) -> Extraction {
        let mut extraction = Extraction::default();
        for (model_index, text) in texts.iter().enumerate() {
            self.extract_into(model_index, text, &mut extraction);
        }
        debug!(
            models = texts.len(),
            statements = extraction.statements.len(),
            paragraphs = extraction.paragraphs.len(),
            "extraction pass finished"
        );
        extraction
    }

    /// Extract one model's text, appending to an existing extraction.
    fn extract_into(&self, model_index: usize, text: &str, out: &mut Extraction) {
        let mut statement_ordinal = 0;
        let mut paragraph_ordinal = 0;

        for block in split_blocks(text) {
            let units: Vec<String> = block
                .into_iter()
                .filter(|u| u.chars().count() >= self.config.min_statement_chars)
                .collect();
            if units.is_empty() {
                continue;
            }

            let paragraph_id = ParagraphId::derive(model_index, paragraph_ordinal);
            paragraph_ordinal += 1;

            let mut statement_ids = Vec::with_capacity(units.len());
            for unit in &units {
                let id = StatementId::derive(model_index, statement_ordinal);
                statement_ordinal += 1;

                let mut statement = Statement::new(id.clone(), model_index, unit.clone());
                statement.paragraph = Some(paragraph_id.clone());
                out.statements.push(statement);
                statement_ids.push(id);
            }

            out.paragraphs.push(Paragraph {
                id: paragraph_id,
                model_index,
                statement_ids,
                text: units.join(" "),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn extract(texts: &[&str]) -> Extraction {
        StatementExtractor::default()
            .extract_all(&texts.iter().map(|t| t.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_sentences_become_statements() {
        let e = extract(&["Water boils at 100C. This varies with altitude."]);
        assert_eq!(e.statements.len(), 2);
        assert_eq!(e.statements[0].text, "Water boils at 100C.");
        assert_eq!(e.statements[1].text, "This varies with altitude.");
    }

    #[test]
    fn test_blocks_become_paragraphs() {
        let e = extract(&["First block. Two sentences.\n\nSecond block here."]);
        assert_eq!(e.paragraphs.len(), 2);
        assert_eq!(e.paragraphs[0].len(), 2);
        assert_eq!(e.paragraphs[1].len(), 1);
    }

    #[test]
    fn test_every_statement_belongs_to_one_paragraph() {
        let e = extract(&[
            "Alpha beta gamma. Delta epsilon.\n\n- item one\n- item two",
            "Another model's answer entirely.",
        ]);
        for statement in &e.statements {
            let owner = statement.paragraph.as_ref().unwrap();
            let owners = e
                .paragraphs
                .iter()
                .filter(|p| p.statement_ids.contains(&statement.id))
                .count();
            assert_eq!(owners, 1);
            assert!(e.paragraphs.iter().any(|p| &p.id == owner));
        }
    }

    #[test]
    fn test_paragraph_model_matches_statements() {
        let e = extract(&["Answer one.", "Answer two.", "Answer three."]);
        for paragraph in &e.paragraphs {
            for sid in &paragraph.statement_ids {
                let statement = e.statements.iter().find(|s| &s.id == sid).unwrap();
                assert_eq!(statement.model_index, paragraph.model_index);
            }
        }
    }

    #[test]
    fn test_ids_are_per_model() {
        let e = extract(&["One sentence.", "Another sentence."]);
        assert_eq!(e.statements[0].id.as_str(), "s0.0");
        assert_eq!(e.statements[1].id.as_str(), "s1.0");
        assert_eq!(e.paragraphs[0].id.as_str(), "p0.0");
        assert_eq!(e.paragraphs[1].id.as_str(), "p1.0");
    }

    #[test]
    fn test_list_items_are_statements() {
        let e = extract(&["Key points:\n- the first point\n- the second point\n* a starred one"]);
        let texts: Vec<&str> = e.statements.iter().map(|s| s.text.as_str()).collect();
        assert!(texts.contains(&"the first point"));
        assert!(texts.contains(&"the second point"));
        assert!(texts.contains(&"a starred one"));
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert!(extract(&[""]).statements.is_empty());
        assert!(extract(&["   \n\n  \n"]).statements.is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let texts = vec![
            "Water boils at 100C at sea level. At altitude it boils lower.\n\n\
             - pressure matters\n- temperature follows"
                .to_string(),
            "## Heading\nThe answer is 42. No, really.".to_string(),
        ];
        let extractor = StatementExtractor::default();
        let a = extractor.extract_all(&texts);
        let b = extractor.extract_all(&texts);
        assert_eq!(a.statements, b.statements);
        assert_eq!(a.paragraphs, b.paragraphs);
    }

    proptest! {
        #[test]
        fn prop_idempotent_on_arbitrary_text(text in "\\PC{0,400}") {
            let extractor = StatementExtractor::default();
            let texts = vec![text];
            let a = extractor.extract_all(&texts);
            let b = extractor.extract_all(&texts);
            prop_assert_eq!(a.statements, b.statements);
            prop_assert_eq!(a.paragraphs, b.paragraphs);
        }

        #[test]
        fn prop_statements_partition_into_paragraphs(text in "\\PC{0,400}") {
            let e = StatementExtractor::default().extract_all(&[text]);
            let mut seen = 0;
            for p in &e.paragraphs {
                seen += p.len();
                for sid in &p.statement_ids {
                    prop_assert!(e.statements.iter().any(|s| &s.id == sid));
                }
            }
            prop_assert_eq!(seen, e.statements.len());
        }
    }
}
