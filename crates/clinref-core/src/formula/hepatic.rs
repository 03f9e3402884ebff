//! MELD score.
//!
//! MELD = 3.78 ln(bilirubin) + 11.2 ln(INR) + 9.57 ln(creatinine) + 6.43
//!
//! Each lab value below 1.0 is treated as 1.0 before the logarithm is taken.
//! Creatinine is capped at 4.0, and set to 4.0 for patients on dialysis.
//! The composite is clamped to 6..=40 and only then rounded.

use crate::models::Category;

use super::{
    Bound, Classification, Domain, Evaluation, Formula, FormulaError, FormulaFamily, FormulaResult,
    InputSpec, Inputs,
};

const INPUTS: [InputSpec; 4] = [
    InputSpec::required("bilirubin", "mg/dL", Bound::Exclusive(0.0), Bound::Inclusive(100.0)),
    InputSpec::required("inr", "ratio", Bound::Exclusive(0.0), Bound::Inclusive(20.0)),
    InputSpec::required("creatinine", "mg/dL", Bound::Exclusive(0.0), Bound::Inclusive(30.0)),
    // 1 = dialysis at least twice in the past week
    InputSpec::optional("dialysis", "flag", Bound::Inclusive(0.0), Bound::Inclusive(1.0)),
];

const LAB_FLOOR: f64 = 1.0;
const CREATININE_CAP: f64 = 4.0;
pub const MELD_MIN: f64 = 6.0;
pub const MELD_MAX: f64 = 40.0;

/// Model for End-Stage Liver Disease.
pub struct Meld;

impl Meld {
    /// Unrounded, unclamped composite after floors and caps.
    pub fn composite(bilirubin: f64, inr: f64, creatinine: f64, dialysis: bool) -> f64 {
        let bilirubin = bilirubin.max(LAB_FLOOR);
        let inr = inr.max(LAB_FLOOR);
        let creatinine = if dialysis {
            CREATININE_CAP
        } else {
            creatinine.max(LAB_FLOOR).min(CREATININE_CAP)
        };

        3.78 * bilirubin.ln() + 11.2 * inr.ln() + 9.57 * creatinine.ln() + 6.43
    }
}

impl Formula for Meld {
    fn id(&self) -> &str {
        "meld"
    }

    fn name(&self) -> &str {
        "MELD"
    }

    fn family(&self) -> FormulaFamily {
        FormulaFamily::LogLinear
    }

    fn inputs(&self) -> &[InputSpec] {
        &INPUTS
    }

    fn unit(&self) -> &str {
        "points"
    }

    fn output_domain(&self) -> Domain {
        Domain::new(Bound::Inclusive(MELD_MIN), Bound::Inclusive(MELD_MAX))
    }

    fn compute(&self, inputs: &Inputs) -> FormulaResult<Evaluation> {
        let bilirubin = inputs.require(self.id(), "bilirubin")?;
        let inr = inputs.require(self.id(), "inr")?;
        let creatinine = inputs.require(self.id(), "creatinine")?;
        let dialysis = match inputs.get("dialysis") {
            None => false,
            Some(flag) if flag == 0.0 => false,
            Some(flag) if flag == 1.0 => true,
            Some(flag) => {
                return Err(FormulaError::InvalidInput {
                    formula: self.id().to_string(),
                    input: "dialysis".into(),
                    value: flag,
                    reason: "must be 0 or 1".into(),
                })
            }
        };

        let composite = Meld::composite(bilirubin, inr, creatinine, dialysis);
        let score = composite.clamp(MELD_MIN, MELD_MAX).round();
        Ok(self.evaluation(score, None))
    }

    fn classify(&self, value: f64, _inputs: &Inputs) -> FormulaResult<Classification> {
        let (category, label) = if value < 10.0 {
            (Category::Normal, "90-day mortality about 2%")
        } else if value < 20.0 {
            (Category::High, "90-day mortality about 6%")
        } else if value < 30.0 {
            (Category::High, "90-day mortality about 20%")
        } else if value < 40.0 {
            (Category::CriticalHigh, "90-day mortality about 53%")
        } else {
            (Category::CriticalHigh, "90-day mortality about 71%")
        };
        Ok(self.classification(value, category, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::registry;

    fn inputs(bili: f64, inr: f64, cr: f64) -> Inputs {
        Inputs::new()
            .with("bilirubin", bili)
            .with("inr", inr)
            .with("creatinine", cr)
    }

    #[test]
    fn test_floor_applied_before_log() {
        // ln(0.3) would be negative; floored to ln(1.0) = 0
        let eval = registry().evaluate("meld", &inputs(0.3, 1.0, 1.0)).unwrap();
        assert_eq!(eval.value, 6.0);
        assert_eq!(Meld::composite(0.3, 0.5, 0.2, false), 6.43);
    }

    #[test]
    fn test_typical_value() {
        let eval = registry().evaluate("meld", &inputs(2.0, 1.5, 1.8)).unwrap();
        assert_eq!(eval.value, 19.0);
    }

    #[test]
    fn test_clamped_to_maximum() {
        let eval = registry().evaluate("meld", &inputs(50.0, 10.0, 8.0)).unwrap();
        assert_eq!(eval.value, MELD_MAX);
    }

    #[test]
    fn test_dialysis_sets_creatinine() {
        let on_dialysis = inputs(2.0, 1.5, 1.2).with("dialysis", 1.0);
        let capped = inputs(2.0, 1.5, 4.0);
        let a = registry().evaluate("meld", &on_dialysis).unwrap();
        let b = registry().evaluate("meld", &capped).unwrap();
        assert_eq!(a.value, b.value);
    }

    #[test]
    fn test_dialysis_flag_must_be_binary() {
        let err = registry()
            .evaluate("meld", &inputs(2.0, 1.5, 1.2).with("dialysis", 0.5))
            .unwrap_err();
        assert!(matches!(err, FormulaError::InvalidInput { .. }));
    }

    #[test]
    fn test_zero_lab_value_rejected() {
        let err = registry().evaluate("meld", &inputs(0.0, 1.0, 1.0)).unwrap_err();
        assert!(matches!(err, FormulaError::InvalidInput { input, .. } if input == "bilirubin"));
    }

    #[test]
    fn test_classification() {
        let c = registry().classify("meld", 35.0, &Inputs::new()).unwrap();
        assert_eq!(c.category, Category::CriticalHigh);
        let c = registry().classify("meld", 8.0, &Inputs::new()).unwrap();
        assert_eq!(c.category, Category::Normal);
    }
}
