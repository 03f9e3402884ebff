//! Heart-rate corrected QT interval.
//!
//! RR (seconds) = 60 / heart rate. Heart rate must lie in a physiological
//! band; a correction that yields a non-positive interval is undefined.

use crate::models::{Category, Gender};

use super::{
    classify_by_gender, Bound, Classification, Domain, Evaluation, Formula, FormulaFamily,
    FormulaResult, InputSpec, Inputs,
};

const INPUTS: [InputSpec; 2] = [
    InputSpec::required("qt_ms", "ms", Bound::Exclusive(0.0), Bound::Inclusive(1000.0)),
    InputSpec::required("heart_rate", "bpm", Bound::Inclusive(20.0), Bound::Inclusive(300.0)),
];

/// QTc above this is high risk regardless of sex.
const QTC_CRITICAL_MS: f64 = 500.0;
const QTC_SHORT_MS: f64 = 350.0;

/// Correction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QtCorrection {
    /// QT / RR^(1/2)
    Bazett,
    /// QT / RR^(1/3)
    Fridericia,
    /// QT + 154 (1 - RR)
    Framingham,
    /// QT + 1.75 (HR - 60)
    Hodges,
}

/// Corrected QT interval under one correction method.
pub struct CorrectedQt {
    correction: QtCorrection,
}

impl CorrectedQt {
    pub fn new(correction: QtCorrection) -> Self {
        Self { correction }
    }

    /// Apply the correction. `heart_rate` must be positive; the result may not be.
    pub fn correct(&self, qt_ms: f64, heart_rate: f64) -> f64 {
        let rr = 60.0 / heart_rate;
        match self.correction {
            QtCorrection::Bazett => qt_ms / rr.sqrt(),
            QtCorrection::Fridericia => qt_ms / rr.cbrt(),
            QtCorrection::Framingham => qt_ms + 154.0 * (1.0 - rr),
            QtCorrection::Hodges => qt_ms + 1.75 * (heart_rate - 60.0),
        }
    }
}

impl Formula for CorrectedQt {
    fn id(&self) -> &str {
        match self.correction {
            QtCorrection::Bazett => "qtc_bazett",
            QtCorrection::Fridericia => "qtc_fridericia",
            QtCorrection::Framingham => "qtc_framingham",
            QtCorrection::Hodges => "qtc_hodges",
        }
    }

    fn name(&self) -> &str {
        match self.correction {
            QtCorrection::Bazett => "QTc (Bazett)",
            QtCorrection::Fridericia => "QTc (Fridericia)",
            QtCorrection::Framingham => "QTc (Framingham)",
            QtCorrection::Hodges => "QTc (Hodges)",
        }
    }

    fn family(&self) -> FormulaFamily {
        FormulaFamily::CorrectedInterval
    }

    fn inputs(&self) -> &[InputSpec] {
        &INPUTS
    }

    fn unit(&self) -> &str {
        "ms"
    }

    fn output_domain(&self) -> Domain {
        Domain::new(Bound::Exclusive(0.0), Bound::Inclusive(2000.0))
    }

    fn compute(&self, inputs: &Inputs) -> FormulaResult<Evaluation> {
        let qt = inputs.require(self.id(), "qt_ms")?;
        let hr = inputs.require(self.id(), "heart_rate")?;
        Ok(self.evaluation(self.correct(qt, hr), None))
    }

    fn classify(&self, value: f64, inputs: &Inputs) -> FormulaResult<Classification> {
        let (category, label) = classify_by_gender(inputs.gender, |g| qtc_band(value, g));
        Ok(self.classification(value, category, label))
    }
}

/// Sex-specific QTc bands (ms).
fn qtc_band(qtc: f64, gender: Gender) -> (Category, &'static str) {
    let (normal_max, borderline_max) = match gender {
        Gender::Female => (460.0, 480.0),
        _ => (450.0, 470.0),
    };

    if qtc > QTC_CRITICAL_MS {
        (Category::CriticalHigh, "markedly prolonged QTc; high torsades risk")
    } else if qtc > borderline_max {
        (Category::High, "prolonged QTc")
    } else if qtc > normal_max {
        (Category::High, "borderline QTc")
    } else if qtc < QTC_SHORT_MS {
        (Category::Low, "short QTc")
    } else {
        (Category::Normal, "normal QTc")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{registry, FormulaError};

    fn inputs(qt: f64, hr: f64) -> Inputs {
        Inputs::new().with("qt_ms", qt).with("heart_rate", hr)
    }

    #[test]
    fn test_rate_60_needs_no_correction() {
        for id in ["qtc_bazett", "qtc_fridericia", "qtc_framingham", "qtc_hodges"] {
            let eval = registry().evaluate(id, &inputs(400.0, 60.0)).unwrap();
            assert!((eval.value - 400.0).abs() < 1e-9, "{} gave {}", id, eval.value);
        }
    }

    #[test]
    fn test_bazett_and_fridericia() {
        // RR = 0.6 s at 100 bpm
        let bazett = registry().evaluate("qtc_bazett", &inputs(360.0, 100.0)).unwrap();
        assert!((bazett.value - 360.0 / 0.6_f64.sqrt()).abs() < 1e-9);

        let fridericia = registry().evaluate("qtc_fridericia", &inputs(360.0, 100.0)).unwrap();
        assert!((fridericia.value - 360.0 / 0.6_f64.cbrt()).abs() < 1e-9);
    }

    #[test]
    fn test_linear_corrections() {
        let framingham = registry().evaluate("qtc_framingham", &inputs(360.0, 100.0)).unwrap();
        assert!((framingham.value - (360.0 + 154.0 * 0.4)).abs() < 1e-9);

        let hodges = registry().evaluate("qtc_hodges", &inputs(360.0, 100.0)).unwrap();
        assert!((hodges.value - 430.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_heart_rate_rejected() {
        for hr in [0.0, -60.0] {
            let err = registry().evaluate("qtc_bazett", &inputs(400.0, hr)).unwrap_err();
            assert!(matches!(err, FormulaError::InvalidInput { input, .. } if input == "heart_rate"));
        }
    }

    #[test]
    fn test_heart_rate_outside_band_rejected() {
        for hr in [5.0, 19.9, 300.1] {
            let err = registry().evaluate("qtc_framingham", &inputs(400.0, hr)).unwrap_err();
            assert!(matches!(err, FormulaError::InvalidInput { input, .. } if input == "heart_rate"));
        }
        assert!(registry().evaluate("qtc_framingham", &inputs(400.0, 20.0)).is_ok());
    }

    #[test]
    fn test_non_positive_corrected_interval_is_undefined() {
        // RR = 3 s: 100 + 154 (1 - 3) = -208
        let err = registry().evaluate("qtc_framingham", &inputs(100.0, 20.0)).unwrap_err();
        assert_eq!(
            err,
            FormulaError::Undefined {
                formula: "qtc_framingham".into()
            }
        );
        // 50 + 1.75 (20 - 60) = -20
        let err = registry().evaluate("qtc_hodges", &inputs(50.0, 20.0)).unwrap_err();
        assert!(matches!(err, FormulaError::Undefined { .. }));
    }

    #[test]
    fn test_sex_specific_cutoffs() {
        let male = Inputs::new().with_gender(Gender::Male);
        let female = Inputs::new().with_gender(Gender::Female);

        let c = registry().classify("qtc_bazett", 455.0, &male).unwrap();
        assert_eq!(c.category, Category::High);
        let c = registry().classify("qtc_bazett", 455.0, &female).unwrap();
        assert_eq!(c.category, Category::Normal);
        let c = registry().classify("qtc_bazett", 510.0, &female).unwrap();
        assert_eq!(c.category, Category::CriticalHigh);
    }

    #[test]
    fn test_unspecified_gender_only_where_tables_agree() {
        let unknown = Inputs::new();
        let c = registry().classify("qtc_bazett", 420.0, &unknown).unwrap();
        assert_eq!(c.category, Category::Normal);
        let c = registry().classify("qtc_bazett", 455.0, &unknown).unwrap();
        assert_eq!(c.category, Category::Unscorable);
        let c = registry().classify("qtc_bazett", 520.0, &unknown).unwrap();
        assert_eq!(c.category, Category::CriticalHigh);
    }
}
