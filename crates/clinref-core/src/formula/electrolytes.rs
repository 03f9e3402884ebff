//! Electrolyte formulas: anion gap, albumin-corrected calcium, free water deficit.

use crate::models::{Category, Gender};

use super::{
    Bound, Classification, Domain, Evaluation, Formula, FormulaFamily, FormulaResult, InputSpec,
    Inputs,
};

/// Albumin (g/dL) assumed by the albumin corrections.
const NORMAL_ALBUMIN: f64 = 4.0;

/// Serum albumin range the corrections are defined over.
const ALBUMIN_MIN: Bound = Bound::Inclusive(0.5);
const ALBUMIN_MAX: Bound = Bound::Inclusive(6.0);

/// Na - (Cl + HCO3), optionally corrected by 2.5 per g/dL of albumin below 4.
pub struct AnionGap;

const ANION_GAP_INPUTS: [InputSpec; 4] = [
    InputSpec::required("sodium", "mEq/L", Bound::Exclusive(0.0), Bound::Inclusive(250.0)),
    InputSpec::required("chloride", "mEq/L", Bound::Exclusive(0.0), Bound::Inclusive(200.0)),
    InputSpec::required("bicarbonate", "mEq/L", Bound::Inclusive(0.0), Bound::Inclusive(60.0)),
    InputSpec::optional("albumin", "g/dL", ALBUMIN_MIN, ALBUMIN_MAX),
];

impl Formula for AnionGap {
    fn id(&self) -> &str {
        "anion_gap"
    }

    fn name(&self) -> &str {
        "Anion gap"
    }

    fn family(&self) -> FormulaFamily {
        FormulaFamily::Linear
    }

    fn inputs(&self) -> &[InputSpec] {
        &ANION_GAP_INPUTS
    }

    fn unit(&self) -> &str {
        "mEq/L"
    }

    fn output_domain(&self) -> Domain {
        Domain::new(Bound::Inclusive(-20.0), Bound::Inclusive(100.0))
    }

    fn compute(&self, inputs: &Inputs) -> FormulaResult<Evaluation> {
        let sodium = inputs.require(self.id(), "sodium")?;
        let chloride = inputs.require(self.id(), "chloride")?;
        let bicarbonate = inputs.require(self.id(), "bicarbonate")?;

        let mut gap = sodium - (chloride + bicarbonate);
        if let Some(albumin) = inputs.get("albumin") {
            gap += 2.5 * (NORMAL_ALBUMIN - albumin);
        }
        Ok(self.evaluation(gap, None))
    }

    fn classify(&self, value: f64, _inputs: &Inputs) -> FormulaResult<Classification> {
        let (category, label) = if value < 8.0 {
            (Category::Low, "low anion gap")
        } else if value <= 12.0 {
            (Category::Normal, "normal anion gap")
        } else {
            (Category::High, "elevated anion gap")
        };
        Ok(self.classification(value, category, label))
    }
}

/// Ca + 0.8 (4 - albumin), mg/dL.
pub struct CorrectedCalcium;

const CALCIUM_INPUTS: [InputSpec; 2] = [
    InputSpec::required("calcium", "mg/dL", Bound::Exclusive(0.0), Bound::Inclusive(30.0)),
    InputSpec::required("albumin", "g/dL", ALBUMIN_MIN, ALBUMIN_MAX),
];

impl Formula for CorrectedCalcium {
    fn id(&self) -> &str {
        "corrected_calcium"
    }

    fn name(&self) -> &str {
        "Corrected calcium"
    }

    fn family(&self) -> FormulaFamily {
        FormulaFamily::Linear
    }

    fn inputs(&self) -> &[InputSpec] {
        &CALCIUM_INPUTS
    }

    fn unit(&self) -> &str {
        "mg/dL"
    }

    fn output_domain(&self) -> Domain {
        Domain::new(Bound::Exclusive(0.0), Bound::Inclusive(30.0))
    }

    fn compute(&self, inputs: &Inputs) -> FormulaResult<Evaluation> {
        let calcium = inputs.require(self.id(), "calcium")?;
        let albumin = inputs.require(self.id(), "albumin")?;
        Ok(self.evaluation(calcium + 0.8 * (NORMAL_ALBUMIN - albumin), None))
    }

    fn classify(&self, value: f64, _inputs: &Inputs) -> FormulaResult<Classification> {
        let (category, label) = if value < 7.0 {
            (Category::CriticalLow, "critically low calcium")
        } else if value < 8.5 {
            (Category::Low, "hypocalcemia")
        } else if value <= 10.5 {
            (Category::Normal, "normal calcium")
        } else if value <= 13.0 {
            (Category::High, "hypercalcemia")
        } else {
            (Category::CriticalHigh, "critically high calcium")
        };
        Ok(self.classification(value, category, label))
    }
}

/// Free water deficit in litres: TBW × (Na / 140 - 1).
///
/// Total body water is weight times a fraction that depends on sex and age.
pub struct FreeWaterDeficit;

const FREE_WATER_INPUTS: [InputSpec; 3] = [
    InputSpec::required("sodium", "mEq/L", Bound::Exclusive(0.0), Bound::Inclusive(250.0)),
    InputSpec::required("weight_kg", "kg", Bound::Exclusive(0.0), Bound::Inclusive(500.0)),
    InputSpec::required("age", "years", Bound::Inclusive(0.0), Bound::Inclusive(130.0)),
];

const TARGET_SODIUM: f64 = 140.0;

impl FreeWaterDeficit {
    /// Fraction of body weight that is water.
    pub fn water_fraction(gender: Gender, age: f64) -> f64 {
        match (gender, age) {
            (_, a) if a < 18.0 => 0.6,
            (Gender::Female, a) if a >= 65.0 => 0.45,
            (Gender::Female, _) => 0.5,
            (_, a) if a >= 65.0 => 0.5,
            _ => 0.6,
        }
    }
}

impl Formula for FreeWaterDeficit {
    fn id(&self) -> &str {
        "free_water_deficit"
    }

    fn name(&self) -> &str {
        "Free water deficit"
    }

    fn family(&self) -> FormulaFamily {
        FormulaFamily::Linear
    }

    fn inputs(&self) -> &[InputSpec] {
        &FREE_WATER_INPUTS
    }

    fn unit(&self) -> &str {
        "L"
    }

    fn compute(&self, inputs: &Inputs) -> FormulaResult<Evaluation> {
        let sodium = inputs.require(self.id(), "sodium")?;
        let weight = inputs.require(self.id(), "weight_kg")?;
        let age = inputs.require(self.id(), "age")?;
        let gender = inputs.require_gender(self.id())?;

        let total_body_water = Self::water_fraction(gender, age) * weight;
        Ok(self.evaluation(total_body_water * (sodium / TARGET_SODIUM - 1.0), None))
    }

    fn classify(&self, value: f64, _inputs: &Inputs) -> FormulaResult<Classification> {
        let (category, label) = if value > 0.0 {
            (Category::High, "free water deficit present")
        } else {
            (Category::Normal, "no free water deficit")
        };
        Ok(self.classification(value, category, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{registry, FormulaError};

    fn electrolytes(na: f64, cl: f64, hco3: f64) -> Inputs {
        Inputs::new()
            .with("sodium", na)
            .with("chloride", cl)
            .with("bicarbonate", hco3)
    }

    #[test]
    fn test_anion_gap() {
        let eval = registry().evaluate("anion_gap", &electrolytes(140.0, 104.0, 24.0)).unwrap();
        assert_eq!(eval.value, 12.0);
        let c = registry().classify("anion_gap", eval.value, &Inputs::new()).unwrap();
        assert_eq!(c.category, Category::Normal);
    }

    #[test]
    fn test_anion_gap_albumin_correction() {
        let inputs = electrolytes(140.0, 104.0, 24.0).with("albumin", 2.0);
        let eval = registry().evaluate("anion_gap", &inputs).unwrap();
        assert_eq!(eval.value, 17.0);
        let c = registry().classify("anion_gap", eval.value, &inputs).unwrap();
        assert_eq!(c.category, Category::High);
    }

    #[test]
    fn test_corrected_calcium() {
        let inputs = Inputs::new().with("calcium", 7.6).with("albumin", 2.0);
        let eval = registry().evaluate("corrected_calcium", &inputs).unwrap();
        assert!((eval.value - 9.2).abs() < 1e-9);
        let c = registry().classify("corrected_calcium", eval.value, &inputs).unwrap();
        assert_eq!(c.category, Category::Normal);
    }

    #[test]
    fn test_corrected_calcium_critical() {
        let c = registry().classify("corrected_calcium", 6.5, &Inputs::new()).unwrap();
        assert_eq!(c.category, Category::CriticalLow);
        let c = registry().classify("corrected_calcium", 14.0, &Inputs::new()).unwrap();
        assert_eq!(c.category, Category::CriticalHigh);
    }

    #[test]
    fn test_albumin_outside_band_rejected() {
        let inputs = Inputs::new().with("calcium", 1.0).with("albumin", 10.0);
        let err = registry().evaluate("corrected_calcium", &inputs).unwrap_err();
        assert!(matches!(err, FormulaError::InvalidInput { input, .. } if input == "albumin"));

        let inputs = electrolytes(140.0, 104.0, 24.0).with("albumin", 0.2);
        let err = registry().evaluate("anion_gap", &inputs).unwrap_err();
        assert!(matches!(err, FormulaError::InvalidInput { input, .. } if input == "albumin"));
    }

    #[test]
    fn test_negative_corrected_calcium_is_undefined() {
        // 1.0 + 0.8 (4 - 6) = -0.6
        let inputs = Inputs::new().with("calcium", 1.0).with("albumin", 6.0);
        let err = registry().evaluate("corrected_calcium", &inputs).unwrap_err();
        assert!(matches!(err, FormulaError::Undefined { .. }));
    }

    #[test]
    fn test_water_fraction_by_sex_and_age() {
        assert_eq!(FreeWaterDeficit::water_fraction(Gender::Male, 40.0), 0.6);
        assert_eq!(FreeWaterDeficit::water_fraction(Gender::Male, 70.0), 0.5);
        assert_eq!(FreeWaterDeficit::water_fraction(Gender::Female, 40.0), 0.5);
        assert_eq!(FreeWaterDeficit::water_fraction(Gender::Female, 70.0), 0.45);
        assert_eq!(FreeWaterDeficit::water_fraction(Gender::Female, 10.0), 0.6);
    }

    #[test]
    fn test_free_water_deficit() {
        let inputs = Inputs::new()
            .with("sodium", 154.0)
            .with("weight_kg", 70.0)
            .with("age", 40.0)
            .with_gender(Gender::Male);
        let eval = registry().evaluate("free_water_deficit", &inputs).unwrap();
        assert!((eval.value - 4.2).abs() < 1e-9);
        let c = registry().classify("free_water_deficit", eval.value, &inputs).unwrap();
        assert_eq!(c.category, Category::High);
    }

    #[test]
    fn test_free_water_deficit_requires_gender() {
        let inputs = Inputs::new()
            .with("sodium", 154.0)
            .with("weight_kg", 70.0)
            .with("age", 40.0);
        let err = registry().evaluate("free_water_deficit", &inputs).unwrap_err();
        assert!(matches!(err, FormulaError::InvalidInput { input, .. } if input == "gender"));
    }
}
