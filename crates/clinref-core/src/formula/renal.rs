//! Renal formulas: BUN/creatinine ratio, CKD-EPI 2021 eGFR.

use crate::models::{Category, Gender};

use super::{
    checked_div, Bound, Classification, Domain, Evaluation, Formula, FormulaFamily, FormulaResult,
    InputSpec, Inputs,
};

/// BUN / creatinine, both in mg/dL.
pub struct BunCreatinineRatio;

const RATIO_INPUTS: [InputSpec; 2] = [
    InputSpec::required("bun", "mg/dL", Bound::Inclusive(0.0), Bound::Inclusive(300.0)),
    // Zero is in domain so that it reaches the division guard.
    InputSpec::required("creatinine", "mg/dL", Bound::Inclusive(0.0), Bound::Inclusive(30.0)),
];

impl Formula for BunCreatinineRatio {
    fn id(&self) -> &str {
        "bun_creatinine_ratio"
    }

    fn name(&self) -> &str {
        "BUN/creatinine ratio"
    }

    fn family(&self) -> FormulaFamily {
        FormulaFamily::Ratio
    }

    fn inputs(&self) -> &[InputSpec] {
        &RATIO_INPUTS
    }

    fn unit(&self) -> &str {
        "ratio"
    }

    fn output_domain(&self) -> Domain {
        Domain::new(Bound::Inclusive(0.0), Bound::Unbounded)
    }

    fn compute(&self, inputs: &Inputs) -> FormulaResult<Evaluation> {
        let bun = inputs.require(self.id(), "bun")?;
        let creatinine = inputs.require(self.id(), "creatinine")?;
        let ratio = checked_div(self.id(), "creatinine", bun, creatinine)?;
        Ok(self.evaluation(ratio, None))
    }

    fn classify(&self, value: f64, _inputs: &Inputs) -> FormulaResult<Classification> {
        let (category, label) = if value < 10.0 {
            (Category::Low, "intrinsic renal disease or low protein intake")
        } else if value <= 20.0 {
            (Category::Normal, "normal ratio")
        } else {
            (Category::High, "prerenal azotemia or upper GI bleeding")
        };
        Ok(self.classification(value, category, label))
    }
}

/// CKD-EPI 2021 creatinine equation (race-free).
///
/// eGFR = 142 × min(Scr/κ, 1)^α × max(Scr/κ, 1)^-1.200 × 0.9938^age × 1.012 [female]
pub struct EgfrCkdEpi2021;

const EGFR_INPUTS: [InputSpec; 2] = [
    InputSpec::required("creatinine", "mg/dL", Bound::Exclusive(0.0), Bound::Inclusive(30.0)),
    InputSpec::required("age", "years", Bound::Inclusive(18.0), Bound::Inclusive(120.0)),
];

impl EgfrCkdEpi2021 {
    pub fn egfr(creatinine: f64, age: f64, gender: Gender) -> f64 {
        let (kappa, alpha, sex_factor) = match gender {
            Gender::Female => (0.7, -0.241, 1.012),
            _ => (0.9, -0.302, 1.0),
        };
        let scaled = creatinine / kappa;
        142.0 * scaled.min(1.0).powf(alpha) * scaled.max(1.0).powf(-1.200) * 0.9938_f64.powf(age) * sex_factor
    }
}

impl Formula for EgfrCkdEpi2021 {
    fn id(&self) -> &str {
        "egfr_ckd_epi_2021"
    }

    fn name(&self) -> &str {
        "eGFR (CKD-EPI 2021)"
    }

    fn family(&self) -> FormulaFamily {
        FormulaFamily::Power
    }

    fn inputs(&self) -> &[InputSpec] {
        &EGFR_INPUTS
    }

    fn unit(&self) -> &str {
        "mL/min/1.73m²"
    }

    fn output_domain(&self) -> Domain {
        Domain::new(Bound::Inclusive(0.0), Bound::Unbounded)
    }

    fn compute(&self, inputs: &Inputs) -> FormulaResult<Evaluation> {
        let creatinine = inputs.require(self.id(), "creatinine")?;
        let age = inputs.require(self.id(), "age")?;
        let gender = inputs.require_gender(self.id())?;
        Ok(self.evaluation(Self::egfr(creatinine, age, gender), None))
    }

    fn classify(&self, value: f64, _inputs: &Inputs) -> FormulaResult<Classification> {
        let (category, label) = if value >= 90.0 {
            (Category::Normal, "G1: normal or high")
        } else if value >= 60.0 {
            (Category::Normal, "G2: mildly decreased")
        } else if value >= 45.0 {
            (Category::Low, "G3a: mildly to moderately decreased")
        } else if value >= 30.0 {
            (Category::Low, "G3b: moderately to severely decreased")
        } else if value >= 15.0 {
            (Category::Low, "G4: severely decreased")
        } else {
            (Category::CriticalLow, "G5: kidney failure")
        };
        Ok(self.classification(value, category, label))
    }
}
