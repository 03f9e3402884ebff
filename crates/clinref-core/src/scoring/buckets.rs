//! Risk bucket classification and table validation.

use crate::models::{RiskBucket, ScoringSystem};

use super::{ScoringError, ScoringResult};

/// Find the bucket containing `total`.
///
/// Buckets are scanned in ascending order of their lower bound.
pub fn classify(total: f64, buckets: &[RiskBucket]) -> ScoringResult<&RiskBucket> {
    if !total.is_finite() {
        return Err(ScoringError::ScaleExceeded { total });
    }

    let mut ordered: Vec<&RiskBucket> = buckets.iter().collect();
    ordered.sort_by(|a, b| a.lower.total_cmp(&b.lower));

    ordered
        .into_iter()
        .find(|b| b.contains(total))
        .ok_or(ScoringError::ScaleExceeded { total })
}

/// Check that `buckets` is ordered, contiguous and covers `[min, max]`.
///
/// Only the last bucket may be open-ended or have an inclusive upper bound.
pub fn validate_buckets(buckets: &[RiskBucket], min: f64, max: f64) -> ScoringResult<()> {
    let invalid = |msg: String| Err(ScoringError::InvalidTable(msg));

    let (first, last) = match (buckets.first(), buckets.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return invalid("no buckets declared".into()),
    };

    for bucket in buckets {
        if bucket.label.trim().is_empty() {
            return invalid(format!("bucket at {} has no label", bucket.lower));
        }
        if !bucket.lower.is_finite() {
            return invalid(format!("bucket '{}' has a non-finite lower bound", bucket.label));
        }
        if let Some(upper) = bucket.upper {
            if !upper.is_finite() {
                return invalid(format!("bucket '{}' has a non-finite upper bound", bucket.label));
            }
            let empty = if bucket.upper_inclusive {
                upper < bucket.lower
            } else {
                upper <= bucket.lower
            };
            if empty {
                return invalid(format!("bucket '{}' is empty", bucket.label));
            }
        }
    }

    for pair in buckets.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        match current.upper {
            None => {
                return invalid(format!(
                    "open-ended bucket '{}' is followed by '{}'",
                    current.label, next.label
                ))
            }
            Some(_) if current.upper_inclusive => {
                return invalid(format!(
                    "only the last bucket may include its upper bound ('{}')",
                    current.label
                ))
            }
            Some(upper) if upper != next.lower => {
                return invalid(format!(
                    "'{}' ends at {} but '{}' starts at {}",
                    current.label, upper, next.label, next.lower
                ))
            }
            Some(_) => {}
        }
    }

    if first.lower > min {
        return invalid(format!(
            "lowest bucket starts at {} but scores can be as low as {}",
            first.lower, min
        ));
    }
    if !last.contains(max) && max >= last.lower {
        return invalid(format!(
            "highest bucket '{}' does not reach the maximum score {}",
            last.label, max
        ));
    }

    Ok(())
}

/// Validate a scoring system's table against the totals its criteria can produce.
pub fn validate_system(system: &ScoringSystem) -> ScoringResult<()> {
    if system.criteria.is_empty() {
        return Err(ScoringError::InvalidTable("no criteria declared".into()));
    }
    for criterion in &system.criteria {
        if !criterion.points.is_finite() {
            return Err(ScoringError::InvalidTable(format!(
                "criterion '{}' has non-finite points",
                criterion.id
            )));
        }
    }

    let (min, max) = system.score_range();
    validate_buckets(&system.buckets, min, max)
}
