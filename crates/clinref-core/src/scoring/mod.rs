//! Rule-based scoring engine.
//!
//! Pipeline: Facts → Criteria → Total → Risk Bucket

mod buckets;
mod evaluator;

pub use buckets::*;
pub use evaluator::*;

use thiserror::Error;

use crate::models::{FactMap, ScoredAssessment, ScoringSystem};

/// Scoring errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Score {total} falls outside every risk bucket")]
    ScaleExceeded { total: f64 },

    #[error("Fact '{fact}' must be a {expected}")]
    FactType { fact: String, expected: &'static str },

    #[error("Invalid risk table: {0}")]
    InvalidTable(String),
}

pub type ScoringResult<T> = Result<T, ScoringError>;

/// Score a scoring system against facts and classify the total.
pub fn assess(system: &ScoringSystem, facts: &FactMap) -> ScoringResult<ScoredAssessment> {
    let score = score(&system.criteria, facts)?;
    let bucket = classify(score.total, &system.buckets)?.clone();

    tracing::debug!(
        system = %system.id,
        total = score.total,
        fired = score.fired.len(),
        bucket = %bucket.label,
        "scoring system assessed"
    );

    Ok(ScoredAssessment {
        system_id: system.id.clone(),
        system_name: system.name.clone(),
        score,
        bucket,
    })
}
