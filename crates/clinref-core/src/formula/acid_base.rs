//! Acid-base formulas: expected respiratory compensation, delta ratio.

use crate::models::Category;

use super::{
    checked_div, Bound, Classification, Domain, Evaluation, Formula, FormulaFamily, FormulaResult,
    InputSpec, Inputs, Tolerance,
};

const BICARBONATE: [InputSpec; 1] = [InputSpec::required(
    "bicarbonate",
    "mEq/L",
    Bound::Exclusive(0.0),
    Bound::Inclusive(60.0),
)];

/// Expected PaCO2 for a primary metabolic disorder: `slope * HCO3 + intercept ± tolerance`.
///
/// Classification compares an observed PaCO2 against the band, not the point estimate.
pub struct ExpectedPco2 {
    id: &'static str,
    name: &'static str,
    slope: f64,
    intercept: f64,
    tolerance: f64,
}

impl ExpectedPco2 {
    /// Winters' formula for metabolic acidosis: 1.5 HCO3 + 8 ± 2.
    pub fn winters() -> Self {
        Self {
            id: "winters",
            name: "Expected PaCO2 (Winters)",
            slope: 1.5,
            intercept: 8.0,
            tolerance: 2.0,
        }
    }

    /// Compensation for metabolic alkalosis: 0.7 HCO3 + 21 ± 2.
    pub fn metabolic_alkalosis() -> Self {
        Self {
            id: "metabolic_alkalosis_pco2",
            name: "Expected PaCO2 (metabolic alkalosis)",
            slope: 0.7,
            intercept: 21.0,
            tolerance: 2.0,
        }
    }

    fn band(&self, inputs: &Inputs) -> FormulaResult<(f64, Tolerance)> {
        let hco3 = inputs.require(self.id, "bicarbonate")?;
        let expected = self.slope * hco3 + self.intercept;
        Ok((expected, Tolerance::around(expected, self.tolerance)))
    }
}

impl Formula for ExpectedPco2 {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn family(&self) -> FormulaFamily {
        FormulaFamily::ExpectedWithTolerance
    }

    fn inputs(&self) -> &[InputSpec] {
        &BICARBONATE
    }

    fn classify_inputs(&self) -> &[InputSpec] {
        &BICARBONATE
    }

    fn unit(&self) -> &str {
        "mmHg"
    }

    /// Observed PaCO2 when classifying.
    fn output_domain(&self) -> Domain {
        Domain::new(Bound::Exclusive(0.0), Bound::Inclusive(200.0))
    }

    fn compute(&self, inputs: &Inputs) -> FormulaResult<Evaluation> {
        let (expected, band) = self.band(inputs)?;
        Ok(self.evaluation(expected, Some(band)))
    }

    fn classify(&self, observed: f64, inputs: &Inputs) -> FormulaResult<Classification> {
        let (_, band) = self.band(inputs)?;
        let (category, label) = if observed < band.low {
            (Category::Low, "below expected; concurrent respiratory alkalosis")
        } else if observed > band.high {
            (Category::High, "above expected; concurrent respiratory acidosis")
        } else {
            (Category::Normal, "within expected range; appropriate compensation")
        };
        Ok(self.classification(observed, category, label))
    }
}

/// Delta ratio: (AG - 12) / (24 - HCO3).
pub struct DeltaRatio;

const DELTA_RATIO_INPUTS: [InputSpec; 2] = [
    InputSpec::required("anion_gap", "mEq/L", Bound::Inclusive(-20.0), Bound::Inclusive(100.0)),
    InputSpec::required("bicarbonate", "mEq/L", Bound::Inclusive(0.0), Bound::Inclusive(60.0)),
];

const NORMAL_ANION_GAP: f64 = 12.0;
const NORMAL_BICARBONATE: f64 = 24.0;

impl Formula for DeltaRatio {
    fn id(&self) -> &str {
        "delta_ratio"
    }

    fn name(&self) -> &str {
        "Delta ratio"
    }

    fn family(&self) -> FormulaFamily {
        FormulaFamily::Ratio
    }

    fn inputs(&self) -> &[InputSpec] {
        &DELTA_RATIO_INPUTS
    }

    fn unit(&self) -> &str {
        "ratio"
    }

    fn compute(&self, inputs: &Inputs) -> FormulaResult<Evaluation> {
        let ag = inputs.require(self.id(), "anion_gap")?;
        let hco3 = inputs.require(self.id(), "bicarbonate")?;
        let ratio = checked_div(
            self.id(),
            "24 - bicarbonate",
            ag - NORMAL_ANION_GAP,
            NORMAL_BICARBONATE - hco3,
        )?;
        Ok(self.evaluation(ratio, None))
    }

    fn classify(&self, value: f64, _inputs: &Inputs) -> FormulaResult<Classification> {
        let (category, label) = if value < 0.4 {
            (Category::Low, "hyperchloremic normal anion gap acidosis")
        } else if value < 0.8 {
            (Category::Low, "mixed high and normal anion gap acidosis")
        } else if value <= 2.0 {
            (Category::Normal, "pure high anion gap acidosis")
        } else {
            (Category::High, "concurrent metabolic alkalosis or chronic respiratory acidosis")
        };
        Ok(self.classification(value, category, label))
    }
}
