//! Completeness and alignment audit
//!
//! Read-only accounting over the allocator's reports. Assigns every
//! statement a single fate by precedence and measures how well the claim
//! set covers the substrate's regions. The audit never changes claims.

use chorus_domain::{
    AlignmentReport, CompletenessReport, Paragraph, ParagraphId, RegionCoverage, RegionId,
    Statement, StatementFate, StatementId,
};
use chorus_allocator::{AllocationOutcome, MergeClass};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Assign a fate to every statement in the turn.
///
/// Precedence, highest first: primary, supporting, unaddressed, noise,
/// orphan. A statement cited by two claims under different fates keeps the
/// strongest one.
pub fn completeness(statements: &[Statement], outcome: &AllocationOutcome) -> CompletenessReport {
    let index_of: BTreeMap<&StatementId, usize> = statements
        .iter()
        .enumerate()
        .map(|(i, s)| (&s.id, i))
        .collect();

    let mut fates: BTreeMap<StatementId, StatementFate> = BTreeMap::new();
    for statement in statements {
        fates.insert(statement.id.clone(), StatementFate::Orphan);
    }

    for (claim_idx, claim) in outcome.claims.iter().enumerate() {
        let report = &outcome.merges[claim_idx];

        for (&stmt_idx, class) in &report.classes {
            let Some(statement) = statements.get(stmt_idx) else {
                continue;
            };
            let canonical = claim.canonical_statement_ids.contains(&statement.id);
            let fate = if canonical {
                if outcome.competitive.is_assigned(stmt_idx, claim_idx) {
                    StatementFate::Primary
                } else {
                    StatementFate::Supporting
                }
            } else {
                match class {
                    MergeClass::Core | MergeClass::BoundaryKept | MergeClass::SupporterFiltered => {
                        StatementFate::Unaddressed
                    }
                    MergeClass::BoundaryDropped | MergeClass::Removed => StatementFate::Noise,
                }
            };
            upgrade(&mut fates, &statement.id, fate);
        }

        // Canonical ids can outlive the classes map when a claim centroid
        // came from citations alone.
        for sid in &claim.canonical_statement_ids {
            if let Some(&stmt_idx) = index_of.get(sid) {
                let fate = if outcome.competitive.is_assigned(stmt_idx, claim_idx) {
                    StatementFate::Primary
                } else {
                    StatementFate::Supporting
                };
                upgrade(&mut fates, sid, fate);
            }
        }
    }

    let report = CompletenessReport { fates };
    debug!(
        statements = statements.len(),
        cited = report.count(StatementFate::Primary) + report.count(StatementFate::Supporting),
        orphans = report.count(StatementFate::Orphan),
        "completeness audited"
    );
    report
}

fn upgrade(fates: &mut BTreeMap<StatementId, StatementFate>, id: &StatementId, fate: StatementFate) {
    let entry = fates.entry(id.clone()).or_insert(StatementFate::Orphan);
    if rank(fate) < rank(*entry) {
        *entry = fate;
    }
}

fn rank(fate: StatementFate) -> u8 {
    match fate {
        StatementFate::Primary => 0,
        StatementFate::Supporting => 1,
        StatementFate::Unaddressed => 2,
        StatementFate::Noise => 3,
        StatementFate::Orphan => 4,
    }
}

/// Measure claim coverage per substrate region.
///
/// A paragraph counts as covered when any of its statements is canonical
/// evidence for some claim. Regions with zero covered paragraphs are listed
/// as unattended.
pub fn alignment(
    regions: &[(RegionId, Vec<ParagraphId>)],
    paragraphs: &[Paragraph],
    outcome: &AllocationOutcome,
) -> AlignmentReport {
    let canonical: BTreeSet<&StatementId> = outcome
        .claims
        .iter()
        .flat_map(|c| c.canonical_statement_ids.iter())
        .collect();

    let paragraph_covered = |pid: &ParagraphId| {
        paragraphs
            .iter()
            .find(|p| &p.id == pid)
            .map(|p| p.statement_ids.iter().any(|sid| canonical.contains(sid)))
            .unwrap_or(false)
    };

    let mut coverage = Vec::with_capacity(regions.len());
    let mut unattended = Vec::new();
    for (region, members) in regions {
        let covered = members.iter().filter(|pid| paragraph_covered(pid)).count();
        if covered == 0 {
            unattended.push(region.clone());
        }
        coverage.push(RegionCoverage {
            region: region.clone(),
            paragraph_count: members.len(),
            covered,
        });
    }

    debug!(
        regions = regions.len(),
        unattended = unattended.len(),
        "alignment audited"
    );
    AlignmentReport {
        regions: coverage,
        unattended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_allocator::{
        Allocator, AllocationInput, ClaimSeed,
    };
    use chorus_domain::ClaimId;

    fn unit(x: f32, y: f32, z: f32) -> Vec<f32> {
        let norm = (x * x + y * y + z * z).sqrt();
        vec![x / norm, y / norm, z / norm]
    }

    /// One paragraph per model, one statement per entry.
    fn turn(
        entries: &[(usize, Vec<f32>)],
    ) -> (Vec<Statement>, Vec<Paragraph>, Vec<Vec<f32>>, Vec<Vec<f32>>) {
        let mut statements = Vec::new();
        let mut embeddings = Vec::new();
        let mut ordinals: BTreeMap<usize, usize> = BTreeMap::new();
        let mut per_model: BTreeMap<usize, Vec<StatementId>> = BTreeMap::new();

        for (model, embedding) in entries {
            let ordinal = ordinals.entry(*model).or_insert(0);
            let id = StatementId::derive(*model, *ordinal);
            *ordinal += 1;
            let mut s = Statement::new(id.clone(), *model, format!("statement {}", id));
            s.paragraph = Some(ParagraphId::derive(*model, 0));
            statements.push(s);
            embeddings.push(embedding.clone());
            per_model.entry(*model).or_default().push(id);
        }

        let mut paragraphs = Vec::new();
        let mut paragraph_embeddings = Vec::new();
        for (model, ids) in &per_model {
            let members: Vec<&[f32]> = entries
                .iter()
                .enumerate()
                .filter(|(_, (m, _))| m == model)
                .map(|(i, _)| embeddings[i].as_slice())
                .collect();
            paragraphs.push(Paragraph {
                id: ParagraphId::derive(*model, 0),
                model_index: *model,
                statement_ids: ids.clone(),
                text: String::new(),
            });
            paragraph_embeddings.push(chorus_domain::embedding::centroid(&members).unwrap());
        }
        (statements, paragraphs, embeddings, paragraph_embeddings)
    }

    fn seed(ordinal: usize, cited: &[(usize, usize)], supporters: Vec<usize>) -> ClaimSeed {
        ClaimSeed {
            id: ClaimId::derive(ordinal),
            label: format!("claim {}", ordinal),
            cited: cited.iter().map(|&(m, o)| StatementId::derive(m, o)).collect(),
            supporters,
            label_embedding: None,
        }
    }

    #[test]
    fn test_cited_statement_is_primary() {
        let (statements, paragraphs, stmt_emb, para_emb) = turn(&[
            (0, unit(1.0, 0.0, 0.1)),
            (1, unit(1.0, 0.1, 0.0)),
            (2, unit(0.0, 0.1, 1.0)),
        ]);
        let input = AllocationInput {
            statements: &statements,
            paragraphs: &paragraphs,
            statement_embeddings: &stmt_emb,
            paragraph_embeddings: &para_emb,
            model_count: 3,
        };
        let seeds = vec![seed(0, &[(0, 0), (1, 0)], vec![0, 1])];
        let outcome = Allocator::default().allocate(&seeds, &input);
        let report = completeness(&statements, &outcome);

        let fate = report.fates[&StatementId::derive(0, 0)];
        assert!(matches!(fate, StatementFate::Primary | StatementFate::Supporting));
        assert!(report.cited_ratio() > 0.0);
    }

    #[test]
    fn test_unpooled_statement_is_orphan() {
        let (statements, paragraphs, stmt_emb, para_emb) = turn(&[
            (0, unit(1.0, 0.0, 0.0)),
            (1, unit(1.0, 0.05, 0.0)),
            (2, unit(0.0, 0.0, 1.0)),
        ]);
        let input = AllocationInput {
            statements: &statements,
            paragraphs: &paragraphs,
            statement_embeddings: &stmt_emb,
            paragraph_embeddings: &para_emb,
            model_count: 3,
        };
        let seeds = vec![seed(0, &[(0, 0), (1, 0)], vec![0, 1])];
        let outcome = Allocator::default().allocate(&seeds, &input);
        let report = completeness(&statements, &outcome);

        // The orthogonal statement never enters the claim's pool.
        assert_eq!(
            report.fates[&StatementId::derive(2, 0)],
            StatementFate::Orphan
        );
    }

    #[test]
    fn test_every_statement_gets_exactly_one_fate() {
        let (statements, paragraphs, stmt_emb, para_emb) = turn(&[
            (0, unit(1.0, 0.0, 0.0)),
            (0, unit(0.9, 0.3, 0.0)),
            (1, unit(1.0, 0.1, 0.0)),
            (2, unit(0.0, 1.0, 0.3)),
        ]);
        let input = AllocationInput {
            statements: &statements,
            paragraphs: &paragraphs,
            statement_embeddings: &stmt_emb,
            paragraph_embeddings: &para_emb,
            model_count: 3,
        };
        let seeds = vec![
            seed(0, &[(0, 0), (1, 0)], vec![0, 1]),
            seed(1, &[(2, 0)], vec![2]),
        ];
        let outcome = Allocator::default().allocate(&seeds, &input);
        let report = completeness(&statements, &outcome);

        assert_eq!(report.fates.len(), statements.len());
        for statement in &statements {
            assert!(report.fates.contains_key(&statement.id));
        }
    }

    #[test]
    fn test_fate_precedence_keeps_strongest() {
        let mut fates = BTreeMap::new();
        let id = StatementId::derive(0, 0);
        fates.insert(id.clone(), StatementFate::Noise);
        upgrade(&mut fates, &id, StatementFate::Supporting);
        assert_eq!(fates[&id], StatementFate::Supporting);
        // Weaker fates never overwrite stronger ones.
        upgrade(&mut fates, &id, StatementFate::Orphan);
        assert_eq!(fates[&id], StatementFate::Supporting);
    }

    #[test]
    fn test_alignment_flags_unattended_region() {
        let (statements, paragraphs, stmt_emb, para_emb) = turn(&[
            (0, unit(1.0, 0.0, 0.0)),
            (1, unit(1.0, 0.1, 0.0)),
            (2, unit(0.0, 0.0, 1.0)),
        ]);
        let input = AllocationInput {
            statements: &statements,
            paragraphs: &paragraphs,
            statement_embeddings: &stmt_emb,
            paragraph_embeddings: &para_emb,
            model_count: 3,
        };
        let seeds = vec![seed(0, &[(0, 0), (1, 0)], vec![0, 1])];
        let outcome = Allocator::default().allocate(&seeds, &input);

        let regions = vec![
            (
                RegionId::derive(0),
                vec![ParagraphId::derive(0, 0), ParagraphId::derive(1, 0)],
            ),
            (RegionId::derive(1), vec![ParagraphId::derive(2, 0)]),
        ];
        let report = alignment(&regions, &paragraphs, &outcome);

        assert_eq!(report.regions.len(), 2);
        assert!(report.regions[0].covered >= 1);
        assert_eq!(report.regions[1].covered, 0);
        assert_eq!(report.unattended, vec![RegionId::derive(1)]);
    }

    #[test]
    fn test_alignment_empty_regions() {
        let outcome = Allocator::default().allocate(
            &[],
            &AllocationInput {
                statements: &[],
                paragraphs: &[],
                statement_embeddings: &[],
                paragraph_embeddings: &[],
                model_count: 0,
            },
        );
        let report = alignment(&[], &[], &outcome);
        assert!(report.regions.is_empty());
        assert!(report.unattended.is_empty());
    }
}
