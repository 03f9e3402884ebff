//! Load-time validation of catalog entries.

use std::collections::HashSet;

use crate::models::{ScoringSystem, TestDefinition};
use crate::scoring::validate_system;

use super::{CatalogError, CatalogResult};

/// Check a test definition's static invariants.
pub fn validate_test(test: &TestDefinition) -> CatalogResult<()> {
    test.check().map_err(|reason| CatalogError::InvalidTest {
        id: test.id.clone(),
        reason,
    })
}

/// Check a scoring system's criteria and that its risk table covers every possible total.
pub fn validate_scoring_system(system: &ScoringSystem) -> CatalogResult<()> {
    let invalid = |reason: String| CatalogError::InvalidScoringSystem {
        id: system.id.clone(),
        reason,
    };

    if system.id.trim().is_empty() {
        return Err(invalid("empty id".into()));
    }

    let mut seen = HashSet::new();
    for criterion in &system.criteria {
        if criterion.id.trim().is_empty() {
            return Err(invalid("criterion with empty id".into()));
        }
        if !seen.insert(criterion.id.as_str()) {
            return Err(invalid(format!("duplicate criterion '{}'", criterion.id)));
        }
        if criterion.predicate.facts().is_empty() {
            return Err(invalid(format!("criterion '{}' reads no facts", criterion.id)));
        }
    }

    validate_system(system).map_err(|e| invalid(e.to_string()))
}
