//! Criteria evaluation.
//!
//! Standalone criteria add their points whenever their predicate holds.
//! Grouped criteria are mutually exclusive: among the matching members of a
//! group, the one with the most points contributes, and the earliest
//! declared member wins a tie.

use std::collections::HashMap;

use crate::models::{Criterion, FactMap, FiredCriterion, ScoreResult};

use super::ScoringResult;

/// Sum the points of every criterion that fires.
pub fn score(criteria: &[Criterion], facts: &FactMap) -> ScoringResult<ScoreResult> {
    // Index of the selected criterion per group
    let mut group_winner: HashMap<&str, usize> = HashMap::new();
    let mut fired_standalone: Vec<usize> = Vec::new();

    for (idx, criterion) in criteria.iter().enumerate() {
        if !criterion.predicate.matches(facts)? {
            continue;
        }
        match criterion.group.as_deref() {
            None => fired_standalone.push(idx),
            Some(group) => {
                group_winner
                    .entry(group)
                    .and_modify(|current| {
                        // Strictly greater, so earlier declarations keep ties
                        if criterion.points > criteria[*current].points {
                            *current = idx;
                        }
                    })
                    .or_insert(idx);
            }
        }
    }

    let mut selected: Vec<usize> = fired_standalone;
    selected.extend(group_winner.values().copied());
    selected.sort_unstable();

    let fired: Vec<FiredCriterion> = selected
        .into_iter()
        .map(|idx| {
            let c = &criteria[idx];
            tracing::trace!(criterion = %c.id, points = c.points, "criterion fired");
            FiredCriterion {
                id: c.id.clone(),
                label: c.label.clone(),
                points: c.points,
                group: c.group.clone(),
            }
        })
        .collect();

    let total = fired.iter().map(|f| f.points).sum();

    Ok(ScoreResult { total, fired })
}
