//! Interpretation of lab values against reference ranges.

use crate::catalog::Catalog;
use crate::models::{Category, Gender, InterpretationResult, Range, TestDefinition, Unit};

use super::{Converter, EngineResult};

/// Classifies values of catalog tests.
pub struct Interpreter<'a> {
    catalog: &'a Catalog,
}

impl<'a> Interpreter<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Interpret a value given in the test's conventional unit.
    pub fn interpret(&self, test_id: &str, value: f64, gender: Gender) -> EngineResult<InterpretationResult> {
        let test = self.catalog.lookup(test_id)?;
        Ok(interpret_value(test, value, gender))
    }

    /// Interpret a value given in either of the test's declared units.
    pub fn interpret_in(
        &self,
        test_id: &str,
        value: f64,
        unit: Unit,
        gender: Gender,
    ) -> EngineResult<InterpretationResult> {
        let test = self.catalog.lookup(test_id)?;
        if !value.is_finite() {
            return Ok(interpret_value(test, value, gender));
        }
        let conventional = Converter::new(self.catalog).to_conventional(test, value, unit)?;
        Ok(interpret_value(test, conventional, gender))
    }
}

/// Classify `value` (conventional unit) against `test`.
///
/// Critical thresholds are checked before the normal range, so a value past
/// one is never reported as merely low or high. `range_used` is the normal
/// range resolved for `gender`, reported for display even when a critical
/// threshold decided the category.
pub fn interpret_value(test: &TestDefinition, value: f64, gender: Gender) -> InterpretationResult {
    let range = test.range_for(gender).copied();
    let category = categorize(test, range.as_ref(), value);

    tracing::debug!(
        test = %test.id,
        value,
        gender = gender.as_str(),
        category = category.as_str(),
        "value interpreted"
    );

    InterpretationResult {
        test_id: test.id.clone(),
        value,
        unit: test.conventional_unit,
        gender,
        category,
        range_used: range,
    }
}

fn categorize(test: &TestDefinition, range: Option<&Range>, value: f64) -> Category {
    if !value.is_finite() {
        return Category::Unscorable;
    }

    if let Some(low) = test.critical_low {
        if value < low {
            return Category::CriticalLow;
        }
    }
    if let Some(high) = test.critical_high {
        if value > high {
            return Category::CriticalHigh;
        }
    }

    match range {
        Some(Range { min: Some(min), .. }) if value < *min => Category::Low,
        Some(Range { max: Some(max), .. }) if value > *max => Category::High,
        Some(Range { min: None, max: None }) | None => Category::Unscorable,
        Some(_) => Category::Normal,
    }
}
