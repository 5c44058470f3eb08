//! Pre-semantic summary construction
//!
//! Builds the structured summary the mapper consumes and renders it as a
//! prompt. The summary is "pre-semantic": paragraph grouping and clustering
//! come from geometry alone, no model has interpreted the content yet.

use chorus_domain::artifact::{SummaryCluster, SummaryParagraph};
use chorus_domain::{Paragraph, PreSemanticSummary};
use chorus_substrate::Cluster;
use std::fmt::Write;

/// Assemble the pre-semantic summary for one turn.
///
/// Cluster member indices refer to positions in `paragraphs`.
pub fn build_summary(
    query: &str,
    paragraphs: &[Paragraph],
    clusters: &[Cluster],
) -> PreSemanticSummary {
    let summary_paragraphs = paragraphs
        .iter()
        .map(|p| SummaryParagraph {
            id: p.id.clone(),
            model_index: p.model_index,
            text: p.text.clone(),
        })
        .collect();

    let summary_clusters = clusters
        .iter()
        .map(|c| SummaryCluster {
            region: c.region.clone(),
            paragraph_ids: c
                .members
                .iter()
                .filter_map(|&i| paragraphs.get(i))
                .map(|p| p.id.clone())
                .collect(),
            uncertain: c.uncertain,
        })
        .collect();

    PreSemanticSummary {
        query: query.to_string(),
        paragraphs: summary_paragraphs,
        clusters: summary_clusters,
    }
}

/// Render the summary as the mapping prompt.
///
/// The prompt carries the paragraph ids verbatim so the mapper can cite
/// them, and asks for the JSON shape `parse_mapper_output` expects.
pub fn render_prompt(summary: &PreSemanticSummary) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Several models answered the question below. Identify the distinct \
         claims they make, which models support each claim, and where the \
         answers conflict or depend on unstated conditions."
    );
    let _ = writeln!(prompt, "\nQuestion: {}", summary.query);

    let _ = writeln!(prompt, "\nAnswers, split into referenced paragraphs:");
    for paragraph in &summary.paragraphs {
        let _ = writeln!(
            prompt,
            "[{}] (model {}) {}",
            paragraph.id, paragraph.model_index, paragraph.text
        );
    }

    if !summary.clusters.is_empty() {
        let _ = writeln!(prompt, "\nParagraphs grouped by similarity:");
        for cluster in &summary.clusters {
            let ids: Vec<&str> = cluster.paragraph_ids.iter().map(|p| p.as_str()).collect();
            let marker = if cluster.uncertain { " (uncertain)" } else { "" };
            let _ = writeln!(prompt, "[{}]{} {}", cluster.region, marker, ids.join(", "));
        }
    }

    let _ = writeln!(
        prompt,
        "\nReply with JSON only:\n\
         {{\"claims\": [{{\"label\": \"...\", \"cited\": [\"s0.0\"], \"supporters\": [0]}}],\n \
         \"edges\": [{{\"from\": \"c0\", \"to\": \"c1\", \"kind\": \"conflicts|supports\", \"question\": \"...\"}}],\n \
         \"conditionals\": [{{\"description\": \"...\", \"affected\": [\"c0\"], \"question\": \"...\"}}]}}\n\
         Cite statements by the ids shown in brackets. Claim ids are c0, c1, ... in list order."
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_domain::{ParagraphId, RegionId, StatementId};

    fn paragraph(model: usize, ordinal: usize, text: &str) -> Paragraph {
        Paragraph {
            id: ParagraphId::derive(model, ordinal),
            model_index: model,
            statement_ids: vec![StatementId::derive(model, ordinal)],
            text: text.to_string(),
        }
    }

    #[test]
    fn test_summary_carries_paragraphs_and_clusters() {
        let paragraphs = vec![
            paragraph(0, 0, "Water boils at 100C."),
            paragraph(1, 0, "Boiling happens at 100 degrees."),
        ];
        let clusters = vec![Cluster {
            region: RegionId::derive(0),
            members: vec![0, 1],
            cohesion: 0.9,
            uncertain: false,
        }];
        let summary = build_summary("When does water boil?", &paragraphs, &clusters);

        assert_eq!(summary.query, "When does water boil?");
        assert_eq!(summary.paragraphs.len(), 2);
        assert_eq!(summary.clusters.len(), 1);
        assert_eq!(
            summary.clusters[0].paragraph_ids,
            vec![ParagraphId::derive(0, 0), ParagraphId::derive(1, 0)]
        );
    }

    #[test]
    fn test_out_of_range_cluster_member_ignored() {
        let paragraphs = vec![paragraph(0, 0, "text")];
        let clusters = vec![Cluster {
            region: RegionId::derive(0),
            members: vec![0, 9],
            cohesion: 0.5,
            uncertain: true,
        }];
        let summary = build_summary("q", &paragraphs, &clusters);
        assert_eq!(summary.clusters[0].paragraph_ids.len(), 1);
    }

    #[test]
    fn test_prompt_cites_paragraph_ids() {
        let paragraphs = vec![paragraph(0, 0, "The sky is blue.")];
        let summary = build_summary("What color is the sky?", &paragraphs, &[]);
        let prompt = render_prompt(&summary);

        assert!(prompt.contains("[p0.0]"));
        assert!(prompt.contains("What color is the sky?"));
        assert!(prompt.contains("\"claims\""));
        // No cluster section when clustering produced nothing.
        assert!(!prompt.contains("grouped by similarity"));
    }
}
