//! Conventional <-> SI unit conversion.

use crate::catalog::Catalog;
use crate::models::{TestDefinition, Unit};

use super::{EngineError, EngineResult};

/// Converts values between a test's two declared units.
pub struct Converter<'a> {
    catalog: &'a Catalog,
}

impl<'a> Converter<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Convert `value` of `test_id` from one declared unit to the other.
    ///
    /// Conventional to SI multiplies by the factor; SI to conventional divides.
    /// Any other pairing, including `from == to`, is `UnsupportedConversion`.
    /// NaN and infinities are `NonFiniteValue`.
    pub fn convert(&self, test_id: &str, value: f64, from: Unit, to: Unit) -> EngineResult<f64> {
        let test = self.catalog.lookup(test_id)?;
        convert_for(test, value, from, to)
    }

    /// Express `value` in the test's conventional unit.
    pub fn to_conventional(&self, test: &TestDefinition, value: f64, unit: Unit) -> EngineResult<f64> {
        if unit == test.conventional_unit && value.is_finite() {
            return Ok(value);
        }
        convert_for(test, value, unit, test.conventional_unit)
    }
}

fn convert_for(test: &TestDefinition, value: f64, from: Unit, to: Unit) -> EngineResult<f64> {
    let unsupported = || EngineError::UnsupportedConversion {
        test_id: test.id.clone(),
        from,
        to,
    };

    if !value.is_finite() {
        return Err(EngineError::NonFiniteValue {
            test_id: test.id.clone(),
            value,
        });
    }

    let (si, factor) = test.si_pair().ok_or_else(unsupported)?;
    let conventional = test.conventional_unit;

    if from == conventional && to == si {
        Ok(value * factor)
    } else if from == si && to == conventional {
        Ok(value / factor)
    } else {
        tracing::debug!(test = %test.id, %from, %to, "conversion not declared for test");
        Err(unsupported())
    }
}
