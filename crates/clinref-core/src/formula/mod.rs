//! Formula evaluator.
//!
//! Each formula is a pure function over named numeric inputs plus the
//! patient's gender. Inputs are checked against the formula's declared
//! domain before anything is computed; out-of-domain input is an error,
//! never a clamped guess.

mod acid_base;
mod electrolytes;
mod hepatic;
mod interval;
mod renal;

pub use acid_base::*;
pub use electrolytes::*;
pub use hepatic::*;
pub use interval::*;
pub use renal::*;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Category, Gender, PatientContext};

/// Formula errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Unknown formula: {0}")]
    UnknownFormula(String),

    #[error("{formula}: missing input '{input}'")]
    MissingInput { formula: String, input: String },

    #[error("{formula}: invalid input '{input}' = {value}: {reason}")]
    InvalidInput {
        formula: String,
        input: String,
        value: f64,
        reason: String,
    },

    #[error("{formula}: division by zero ({denominator} is zero)")]
    DivisionByZero { formula: String, denominator: String },

    #[error("{formula}: result is undefined for these inputs")]
    Undefined { formula: String },
}

pub type FormulaResult<T> = Result<T, FormulaError>;

/// Broad family a formula belongs to. Each family has its own edge-case policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaFamily {
    /// Quotient of two measurements; guards the denominator
    Ratio,
    /// Interval corrected by a heart-rate-derived cycle length
    CorrectedInterval,
    /// Weighted logarithms with input floors and a clamped result
    LogLinear,
    /// Point estimate with a tolerance band
    ExpectedWithTolerance,
    /// Linear combination of measurements
    Linear,
    /// Power-law estimating equation
    Power,
}

impl FormulaFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaFamily::Ratio => "ratio",
            FormulaFamily::CorrectedInterval => "corrected_interval",
            FormulaFamily::LogLinear => "log_linear",
            FormulaFamily::ExpectedWithTolerance => "expected_with_tolerance",
            FormulaFamily::Linear => "linear",
            FormulaFamily::Power => "power",
        }
    }
}

/// One end of an input domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Unbounded,
    Inclusive(f64),
    Exclusive(f64),
}

/// Interval of admissible values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub min: Bound,
    pub max: Bound,
}

impl Domain {
    pub const UNBOUNDED: Domain = Domain::new(Bound::Unbounded, Bound::Unbounded);

    pub const fn new(min: Bound, max: Bound) -> Self {
        Self { min, max }
    }

    /// Check a value against the domain, describing the violated bound.
    pub fn check(&self, value: f64) -> Result<(), String> {
        if !value.is_finite() {
            return Err("not a finite number".into());
        }
        match self.min {
            Bound::Inclusive(min) if value < min => return Err(format!("must be >= {}", min)),
            Bound::Exclusive(min) if value <= min => return Err(format!("must be > {}", min)),
            _ => {}
        }
        match self.max {
            Bound::Inclusive(max) if value > max => return Err(format!("must be <= {}", max)),
            Bound::Exclusive(max) if value >= max => return Err(format!("must be < {}", max)),
            _ => {}
        }
        Ok(())
    }
}

/// Declared input of a formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSpec {
    pub name: &'static str,
    pub unit: &'static str,
    pub min: Bound,
    pub max: Bound,
    pub required: bool,
}

impl InputSpec {
    pub const fn required(name: &'static str, unit: &'static str, min: Bound, max: Bound) -> Self {
        Self {
            name,
            unit,
            min,
            max,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, unit: &'static str, min: Bound, max: Bound) -> Self {
        Self {
            name,
            unit,
            min,
            max,
            required: false,
        }
    }

    pub fn check(&self, value: f64) -> Result<(), String> {
        Domain::new(self.min, self.max).check(value)
    }
}

/// Named inputs for a formula call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inputs {
    pub values: BTreeMap<String, f64>,
    #[serde(default)]
    pub gender: Gender,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed inputs from a patient: gender, and `age` when known.
    pub fn for_patient(patient: &PatientContext) -> Self {
        let mut inputs = Self::new().with_gender(patient.gender);
        if let Some(age) = patient.age_years {
            inputs.insert("age", f64::from(age));
        }
        inputs
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Fetch an input, failing with `MissingInput` when absent.
    pub fn require(&self, formula: &str, name: &str) -> FormulaResult<f64> {
        self.get(name).ok_or_else(|| FormulaError::MissingInput {
            formula: formula.to_string(),
            input: name.to_string(),
        })
    }

    /// Gender, failing with `InvalidInput` when it is unspecified.
    pub fn require_gender(&self, formula: &str) -> FormulaResult<Gender> {
        match self.gender {
            Gender::Unspecified => Err(FormulaError::InvalidInput {
                formula: formula.to_string(),
                input: "gender".into(),
                value: f64::NAN,
                reason: "formula is sex-specific".into(),
            }),
            g => Ok(g),
        }
    }
}

/// Tolerance band around an expected value, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub low: f64,
    pub high: f64,
}

impl Tolerance {
    pub fn around(center: f64, plus_minus: f64) -> Self {
        Self {
            low: center - plus_minus,
            high: center + plus_minus,
        }
    }
}

/// Output of evaluating a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub formula_id: String,
    pub value: f64,
    pub unit: String,
    /// Acceptable band, for expected-value formulas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<Tolerance>,
}

/// Interpretation of a formula value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub formula_id: String,
    pub value: f64,
    pub category: Category,
    pub label: String,
}

/// A registered clinical formula.
pub trait Formula: Send + Sync {
    /// Unique identifier (e.g., "qtc_bazett").
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    fn family(&self) -> FormulaFamily;

    /// Declared inputs with their valid domains.
    fn inputs(&self) -> &[InputSpec];

    /// Unit of the computed value.
    fn unit(&self) -> &str;

    /// Compute the value. Inputs have already passed domain checks.
    fn compute(&self, inputs: &Inputs) -> FormulaResult<Evaluation>;

    /// Interpret a value of this formula for the given inputs.
    ///
    /// For expected-value formulas `value` is the observed measurement and
    /// `inputs` determine the expected band.
    fn classify(&self, value: f64, inputs: &Inputs) -> FormulaResult<Classification>;

    /// Values this formula can produce. `classify` rejects anything outside it.
    fn output_domain(&self) -> Domain {
        Domain::UNBOUNDED
    }

    /// Inputs `classify` reads besides the value itself.
    fn classify_inputs(&self) -> &[InputSpec] {
        &[]
    }

    /// Build an evaluation of this formula.
    fn evaluation(&self, value: f64, tolerance: Option<Tolerance>) -> Evaluation {
        Evaluation {
            formula_id: self.id().to_string(),
            value,
            unit: self.unit().to_string(),
            tolerance,
        }
    }

    /// Build a classification of this formula.
    fn classification(&self, value: f64, category: Category, label: &str) -> Classification {
        Classification {
            formula_id: self.id().to_string(),
            value,
            category,
            label: label.to_string(),
        }
    }
}

/// Registry of formulas, keyed by id.
pub struct FormulaRegistry {
    formulas: Vec<Box<dyn Formula>>,
}

impl FormulaRegistry {
    /// Registry holding every built-in formula.
    pub fn builtin() -> Self {
        Self {
            formulas: vec![
                Box::new(CorrectedQt::new(QtCorrection::Bazett)),
                Box::new(CorrectedQt::new(QtCorrection::Fridericia)),
                Box::new(CorrectedQt::new(QtCorrection::Framingham)),
                Box::new(CorrectedQt::new(QtCorrection::Hodges)),
                Box::new(ExpectedPco2::winters()),
                Box::new(ExpectedPco2::metabolic_alkalosis()),
                Box::new(Meld),
                Box::new(BunCreatinineRatio),
                Box::new(DeltaRatio),
                Box::new(AnionGap),
                Box::new(CorrectedCalcium),
                Box::new(EgfrCkdEpi2021),
                Box::new(FreeWaterDeficit),
            ],
        }
    }

    pub fn get(&self, id: &str) -> FormulaResult<&dyn Formula> {
        self.formulas
            .iter()
            .find(|f| f.id() == id)
            .map(|f| f.as_ref())
            .ok_or_else(|| FormulaError::UnknownFormula(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Formula> {
        self.formulas.iter().map(|f| f.as_ref())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.formulas.iter().map(|f| f.id()).collect()
    }

    /// Check inputs, then compute.
    pub fn evaluate(&self, id: &str, inputs: &Inputs) -> FormulaResult<Evaluation> {
        let formula = self.get(id)?;
        check_inputs(id, formula.inputs(), inputs)?;
        let evaluation = formula.compute(inputs)?;

        // Inputs in domain can still combine into an impossible result
        if formula.output_domain().check(evaluation.value).is_err() {
            tracing::debug!(formula = id, value = evaluation.value, "result outside output domain");
            return Err(FormulaError::Undefined {
                formula: id.to_string(),
            });
        }

        tracing::debug!(formula = id, value = evaluation.value, "formula evaluated");
        Ok(evaluation)
    }

    /// Check inputs, then interpret `value`.
    pub fn classify(&self, id: &str, value: f64, inputs: &Inputs) -> FormulaResult<Classification> {
        let formula = self.get(id)?;
        formula
            .output_domain()
            .check(value)
            .map_err(|reason| FormulaError::InvalidInput {
                formula: id.to_string(),
                input: "value".into(),
                value,
                reason,
            })?;
        check_inputs(id, formula.classify_inputs(), inputs)?;
        let classification = formula.classify(value, inputs)?;

        tracing::debug!(
            formula = id,
            value,
            category = classification.category.as_str(),
            "formula value classified"
        );
        Ok(classification)
    }
}

static BUILTIN: LazyLock<FormulaRegistry> = LazyLock::new(FormulaRegistry::builtin);

/// The process-wide registry of built-in formulas.
pub fn registry() -> &'static FormulaRegistry {
    &BUILTIN
}

/// Check every declared input against its domain.
fn check_inputs(formula: &str, specs: &[InputSpec], inputs: &Inputs) -> FormulaResult<()> {
    for spec in specs {
        match inputs.get(spec.name) {
            None if spec.required => {
                return Err(FormulaError::MissingInput {
                    formula: formula.to_string(),
                    input: spec.name.to_string(),
                })
            }
            None => {}
            Some(value) => {
                spec.check(value).map_err(|reason| FormulaError::InvalidInput {
                    formula: formula.to_string(),
                    input: spec.name.to_string(),
                    value,
                    reason,
                })?;
            }
        }
    }
    Ok(())
}

/// Divide, failing with `DivisionByZero` when the denominator is zero.
pub(crate) fn checked_div(formula: &str, denominator_name: &str, num: f64, den: f64) -> FormulaResult<f64> {
    if den == 0.0 {
        return Err(FormulaError::DivisionByZero {
            formula: formula.to_string(),
            denominator: denominator_name.to_string(),
        });
    }
    Ok(num / den)
}

/// Classify under both genders; agree or return `Unscorable`.
///
/// Used by sex-specific cutoff tables when the patient's gender is unknown.
pub(crate) fn classify_by_gender<F>(gender: Gender, table: F) -> (Category, &'static str)
where
    F: Fn(Gender) -> (Category, &'static str),
{
    match gender {
        Gender::Unspecified => {
            let male = table(Gender::Male);
            let female = table(Gender::Female);
            if male == female {
                male
            } else if male.0 == female.0 {
                (male.0, "grade is sex-specific; gender not recorded")
            } else {
                (Category::Unscorable, "sex-specific cutoff; gender not recorded")
            }
        }
        g => table(g),
    }
}
