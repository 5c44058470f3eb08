//! Claim graph assembly
//!
//! Conflict components via union-find over `conflicts` edges. Claims outside
//! any conflict component form the foundation tier (tier 0); each conflict
//! component becomes its own tier, ordered by first-claim appearance.
//! Forcing points derive one-to-one from conflicts and conditionals.

use chorus_domain::{
    Claim, ClaimEdge, ClaimId, Conditional, EdgeKind, ForcingPoint, ForcingPointKind, TierLayer,
};
use tracing::{debug, warn};

/// Assemble tiers and forcing points over a claim set.
///
/// Attaches each edge to its source claim and writes tier indices onto the
/// claims. Edges or conditionals referencing unknown claim ids are dropped
/// with a warning rather than failing the turn.
pub fn assemble(
    claims: &mut [Claim],
    edges: &[ClaimEdge],
    conditionals: &[Conditional],
) -> (Vec<TierLayer>, Vec<ForcingPoint>) {
    let ids: Vec<ClaimId> = claims.iter().map(|c| c.id.clone()).collect();
    let index_of = |id: &ClaimId| ids.iter().position(|c| c == id);

    let mut kept_edges: Vec<ClaimEdge> = Vec::new();
    for edge in edges {
        if index_of(&edge.from).is_none() || index_of(&edge.to).is_none() {
            warn!(from = %edge.from, to = %edge.to, "edge references unknown claim, dropped");
            continue;
        }
        kept_edges.push(edge.clone());
    }
    for edge in &kept_edges {
        if let Some(i) = index_of(&edge.from) {
            claims[i].edges.push(edge.clone());
        }
    }

    // Conflict components.
    let n = claims.len();
    let mut parent: Vec<usize> = (0..n).collect();
    let mut in_conflict = vec![false; n];
    for edge in &kept_edges {
        if edge.kind != EdgeKind::Conflicts {
            continue;
        }
        if let (Some(a), Some(b)) = (index_of(&edge.from), index_of(&edge.to)) {
            union(&mut parent, a, b);
            in_conflict[a] = true;
            in_conflict[b] = true;
        }
    }

    // Foundation tier, then one tier per conflict component ordered by its
    // first claim's appearance.
    let foundation: Vec<ClaimId> = (0..n)
        .filter(|&i| !in_conflict[i])
        .map(|i| claims[i].id.clone())
        .collect();
    let mut tiers = vec![TierLayer {
        index: 0,
        claim_ids: foundation,
        conditionals: Vec::new(),
    }];

    let mut component_roots: Vec<usize> = Vec::new();
    for i in 0..n {
        if !in_conflict[i] {
            continue;
        }
        let root = find(&mut parent, i);
        if !component_roots.contains(&root) {
            component_roots.push(root);
            let members: Vec<ClaimId> = (0..n)
                .filter(|&j| in_conflict[j] && find(&mut parent, j) == root)
                .map(|j| claims[j].id.clone())
                .collect();
            tiers.push(TierLayer {
                index: tiers.len(),
                claim_ids: members,
                conditionals: Vec::new(),
            });
        }
    }

    for tier in &tiers {
        for id in &tier.claim_ids {
            if let Some(i) = index_of(id) {
                claims[i].tier = Some(tier.index);
            }
        }
    }

    // Conditionals attach to every tier containing an affected claim.
    for (cond_idx, conditional) in conditionals.iter().enumerate() {
        for tier in tiers.iter_mut() {
            let touches = conditional
                .affected
                .iter()
                .any(|id| tier.claim_ids.contains(id));
            if touches {
                tier.conditionals.push(cond_idx);
            }
        }
    }

    let forcing_points = derive_forcing_points(claims, &kept_edges, conditionals);

    debug!(
        claims = n,
        tiers = tiers.len(),
        forcing_points = forcing_points.len(),
        "claim graph assembled"
    );
    (tiers, forcing_points)
}

/// One forcing point per conflict edge and per conditional, in derivation
/// order, carrying minimal statement justification.
fn derive_forcing_points(
    claims: &[Claim],
    edges: &[ClaimEdge],
    conditionals: &[Conditional],
) -> Vec<ForcingPoint> {
    let label_of = |id: &ClaimId| {
        claims
            .iter()
            .find(|c| &c.id == id)
            .map(|c| c.label.clone())
            .unwrap_or_default()
    };
    let justification_for = |ids: &[ClaimId]| {
        ids.iter()
            .filter_map(|id| claims.iter().find(|c| &c.id == id))
            .filter_map(|c| c.canonical_statement_ids.first().cloned())
            .collect::<Vec<_>>()
    };

    let mut points = Vec::new();
    for edge in edges {
        if edge.kind != EdgeKind::Conflicts {
            continue;
        }
        let affected = vec![edge.from.clone(), edge.to.clone()];
        let question = edge.question.clone().unwrap_or_else(|| {
            format!(
                "Which holds: \"{}\" or \"{}\"?",
                label_of(&edge.from),
                label_of(&edge.to)
            )
        });
        points.push(ForcingPoint {
            id: format!("f{}", points.len()),
            kind: ForcingPointKind::Conflict,
            justification: justification_for(&affected),
            claims: affected,
            question,
        });
    }
    for conditional in conditionals {
        let question = conditional
            .question
            .clone()
            .unwrap_or_else(|| conditional.description.clone());
        points.push(ForcingPoint {
            id: format!("f{}", points.len()),
            kind: ForcingPointKind::Conditional,
            justification: justification_for(&conditional.affected),
            claims: conditional.affected.clone(),
            question,
        });
    }
    points
}

fn find(parent: &mut Vec<usize>, i: usize) -> usize {
    let mut root = i;
    while parent[root] != root {
        root = parent[root];
    }
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
        parent[ra.max(rb)] = ra.min(rb);
    }
}
