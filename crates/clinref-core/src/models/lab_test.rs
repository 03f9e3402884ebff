//! Laboratory test definitions and reference ranges.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Gender, Unit};

/// A normal range. At least one bound is present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Range {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// Check the range is usable: some bound, finite bounds, min <= max.
    pub fn check(&self) -> Result<(), String> {
        if self.min.is_none() && self.max.is_none() {
            return Err("range has neither min nor max".into());
        }
        for bound in [self.min, self.max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(format!("range bound {} is not finite", bound));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(format!("range min {} exceeds max {}", min, max));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "{}-{}", min, max),
            (None, Some(max)) => write!(f, "<= {}", max),
            (Some(min), None) => write!(f, ">= {}", min),
            (None, None) => f.write_str("unbounded"),
        }
    }
}

/// Gender-specific ranges. Both genders are mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenderRanges {
    pub male: Range,
    pub female: Range,
}

/// One measurable clinical quantity in the reference catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDefinition {
    /// Unique key (e.g., "calcium")
    pub id: String,
    /// English display name
    pub display_name: String,
    /// Name in the catalog's secondary language
    #[serde(default)]
    pub localized_name: String,
    /// Unit values are reported in by default
    pub conventional_unit: Unit,
    /// SI unit, if the test has one distinct from the conventional unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub si_unit: Option<Unit>,
    /// value_si = value_conventional * factor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub si_conversion_factor: Option<f64>,
    /// Ungendered normal range, in the conventional unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_range: Option<Range>,
    /// Gender overrides for the normal range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_range_by_gender: Option<GenderRanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_high: Option<f64>,
}

impl TestDefinition {
    /// Create a definition with only the required fields.
    pub fn new(id: &str, display_name: &str, conventional_unit: Unit) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            localized_name: String::new(),
            conventional_unit,
            si_unit: None,
            si_conversion_factor: None,
            normal_range: None,
            normal_range_by_gender: None,
            critical_low: None,
            critical_high: None,
        }
    }

    pub fn with_si(mut self, si_unit: Unit, factor: f64) -> Self {
        self.si_unit = Some(si_unit);
        self.si_conversion_factor = Some(factor);
        self
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.normal_range = Some(range);
        self
    }

    pub fn with_gender_ranges(mut self, male: Range, female: Range) -> Self {
        self.normal_range_by_gender = Some(GenderRanges { male, female });
        self
    }

    pub fn with_critical(mut self, low: Option<f64>, high: Option<f64>) -> Self {
        self.critical_low = low;
        self.critical_high = high;
        self
    }

    /// The (SI unit, factor) pair, if both are declared.
    pub fn si_pair(&self) -> Option<(Unit, f64)> {
        match (self.si_unit, self.si_conversion_factor) {
            (Some(unit), Some(factor)) => Some((unit, factor)),
            _ => None,
        }
    }

    /// Resolve the normal range for a gender: override first, then ungendered.
    pub fn range_for(&self, gender: Gender) -> Option<&Range> {
        let gendered = self.normal_range_by_gender.as_ref().and_then(|r| match gender {
            Gender::Male => Some(&r.male),
            Gender::Female => Some(&r.female),
            Gender::Unspecified => None,
        });
        gendered.or(self.normal_range.as_ref())
    }

    /// Check the static invariants of this definition.
    ///
    /// Returns a description of the first violation found.
    pub fn check(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("empty id".into());
        }
        if self.display_name.trim().is_empty() {
            return Err("empty display name".into());
        }

        match (self.si_unit, self.si_conversion_factor) {
            (None, None) => {}
            (Some(_), None) => return Err("si_unit declared without si_conversion_factor".into()),
            (None, Some(_)) => return Err("si_conversion_factor declared without si_unit".into()),
            (Some(si), Some(factor)) => {
                if si == self.conventional_unit {
                    return Err(format!("si_unit {} equals conventional unit", si));
                }
                if !factor.is_finite() || factor <= 0.0 {
                    return Err(format!("invalid si_conversion_factor {}", factor));
                }
            }
        }

        let mut ranges = Vec::new();
        if let Some(range) = &self.normal_range {
            ranges.push(("normal_range", range));
        }
        if let Some(gendered) = &self.normal_range_by_gender {
            ranges.push(("male range", &gendered.male));
            ranges.push(("female range", &gendered.female));
        }
        for (name, range) in &ranges {
            range.check().map_err(|e| format!("{}: {}", name, e))?;
        }

        for critical in [self.critical_low, self.critical_high].into_iter().flatten() {
            if !critical.is_finite() {
                return Err(format!("critical threshold {} is not finite", critical));
            }
        }
        if let (Some(low), Some(high)) = (self.critical_low, self.critical_high) {
            if low >= high {
                return Err(format!("critical_low {} is not below critical_high {}", low, high));
            }
        }
        // Critical thresholds must sit outside every normal range they bracket.
        for (name, range) in &ranges {
            if let (Some(low), Some(min)) = (self.critical_low, range.min) {
                if low > min {
                    return Err(format!("critical_low {} lies inside {} {}", low, name, range));
                }
            }
            if let (Some(high), Some(max)) = (self.critical_high, range.max) {
                if high < max {
                    return Err(format!("critical_high {} lies inside {} {}", high, name, range));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hemoglobin() -> TestDefinition {
        TestDefinition::new("hemoglobin", "Hemoglobin", Unit::GPerDl)
            .with_si(Unit::GPerL, 10.0)
            .with_gender_ranges(Range::between(13.5, 17.5), Range::between(12.0, 15.5))
            .with_critical(Some(7.0), Some(20.0))
    }

    #[test]
    fn test_gender_override_wins() {
        let test = hemoglobin().with_range(Range::between(12.0, 17.5));
        assert_eq!(test.range_for(Gender::Male), Some(&Range::between(13.5, 17.5)));
        assert_eq!(test.range_for(Gender::Female), Some(&Range::between(12.0, 15.5)));
        assert_eq!(test.range_for(Gender::Unspecified), Some(&Range::between(12.0, 17.5)));
    }

    #[test]
    fn test_unspecified_without_ungendered_range() {
        assert_eq!(hemoglobin().range_for(Gender::Unspecified), None);
    }

    #[test]
    fn test_valid_definition() {
        assert!(hemoglobin().check().is_ok());
    }

    #[test]
    fn test_si_unit_requires_factor() {
        let mut test = hemoglobin();
        test.si_conversion_factor = None;
        assert!(test.check().is_err());

        let test = hemoglobin().with_si(Unit::GPerL, 0.0);
        assert!(test.check().is_err());
    }

    #[test]
    fn test_critical_inside_range_rejected() {
        let test = hemoglobin().with_critical(Some(13.0), None);
        let err = test.check().unwrap_err();
        assert!(err.contains("critical_low"), "{}", err);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let test = TestDefinition::new("x", "X", Unit::MgPerDl).with_range(Range::between(5.0, 1.0));
        assert!(test.check().is_err());
    }

    #[test]
    fn test_range_display() {
        assert_eq!(Range::between(8.5, 10.5).to_string(), "8.5-10.5");
        assert_eq!(Range::at_most(200.0).to_string(), "<= 200");
        assert_eq!(Range::at_least(40.0).to_string(), ">= 40");
    }
}
