//! Clinref Core Library
//!
//! Clinical reference data and rule evaluation: lab reference ranges with
//! unit conversion, derived-value formulas, and rule-based risk scores.
//!
//! # Architecture
//!
//! ```text
//!   lab_tests.json        scoring_systems.json
//!         │                       │
//!         └──────────┬────────────┘
//!                    ▼
//!          Catalog (validated once, immutable)
//!                    │
//!        ┌───────────┼──────────────┬─────────────────┐
//!        ▼           ▼              ▼                 ▼
//!    Converter   Interpreter   FormulaRegistry   Scoring engine
//!   (conv ↔ SI)  (value → cat) (inputs → value)  (facts → bucket)
//! ```
//!
//! # Core Principle
//!
//! **Never substitute a default for missing or invalid data.** An unknown
//! test, an undeclared unit or an out-of-domain input is an error, and a
//! value with no applicable reference range is `Unscorable`, never `Normal`.
//!
//! # Modules
//!
//! - [`models`]: Domain types (TestDefinition, Range, Criterion, RiskBucket, etc.)
//! - [`catalog`]: Loading, validation, search and hot swapping of reference data
//! - [`engine`]: Unit conversion and interpretation over a catalog
//! - [`formula`]: Registry of clinical formulas with declared input domains
//! - [`scoring`]: Criteria scoring and risk bucket classification

pub mod catalog;
pub mod engine;
pub mod formula;
pub mod models;
pub mod scoring;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError, CatalogHandle, CatalogSource};
pub use engine::{Engine, EngineError};
pub use formula::{Formula, FormulaError, FormulaRegistry, Inputs};
pub use models::{
    Category, Criterion, Fact, FactMap, Gender, InterpretationResult, PatientContext, Predicate, Range,
    RiskBucket, ScoringSystem, TestDefinition, Unit,
};
pub use scoring::ScoringError;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

// =========================================================================
// FFI Error Type
// =========================================================================

/// One variant per error kind, so callers can tell a failure from a result.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinrefError {
    #[error("Unknown test: {0}")]
    UnknownTest(String),

    #[error("Unknown formula: {0}")]
    UnknownFormula(String),

    #[error("Unknown scoring system: {0}")]
    UnknownScoringSystem(String),

    #[error("Unsupported conversion: {0}")]
    UnsupportedConversion(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Scale exceeded: {0}")]
    ScaleExceeded(String),

    #[error("Catalog error: {0}")]
    CatalogError(String),
}

impl From<CatalogError> for ClinrefError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::UnknownTest { .. } => ClinrefError::UnknownTest(e.to_string()),
            CatalogError::UnknownScoringSystem(id) => ClinrefError::UnknownScoringSystem(id),
            other => ClinrefError::CatalogError(other.to_string()),
        }
    }
}

impl From<FormulaError> for ClinrefError {
    fn from(e: FormulaError) -> Self {
        match e {
            FormulaError::UnknownFormula(id) => ClinrefError::UnknownFormula(id),
            FormulaError::DivisionByZero { .. } => ClinrefError::DivisionByZero(e.to_string()),
            other => ClinrefError::InvalidInput(other.to_string()),
        }
    }
}

impl From<ScoringError> for ClinrefError {
    fn from(e: ScoringError) -> Self {
        match e {
            ScoringError::ScaleExceeded { .. } => ClinrefError::ScaleExceeded(e.to_string()),
            ScoringError::FactType { .. } => ClinrefError::InvalidInput(e.to_string()),
            ScoringError::InvalidTable(_) => ClinrefError::CatalogError(e.to_string()),
        }
    }
}

impl From<EngineError> for ClinrefError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Catalog(e) => e.into(),
            EngineError::UnsupportedConversion { .. } => ClinrefError::UnsupportedConversion(e.to_string()),
            EngineError::NonFiniteValue { .. } => ClinrefError::InvalidInput(e.to_string()),
            EngineError::Formula(e) => e.into(),
            EngineError::Scoring(e) => e.into(),
        }
    }
}

fn parse_unit(unit: &str) -> Result<Unit, ClinrefError> {
    unit.parse().map_err(ClinrefError::InvalidInput)
}

fn parse_gender(gender: &str) -> Result<Gender, ClinrefError> {
    gender.parse().map_err(ClinrefError::InvalidInput)
}

fn parse_date(date: &str) -> Result<NaiveDate, ClinrefError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| ClinrefError::InvalidInput(format!("invalid date '{}': {}", date, e)))
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open an engine over the embedded reference catalog.
#[uniffi::export]
pub fn open_engine() -> Result<Arc<ClinrefEngine>, ClinrefError> {
    let catalog = Catalog::embedded()?;
    Ok(Arc::new(ClinrefEngine {
        catalog: CatalogHandle::new(catalog),
    }))
}

/// Open an engine over a catalog directory (site-specific reference ranges).
#[uniffi::export]
pub fn open_engine_from_dir(path: String) -> Result<Arc<ClinrefEngine>, ClinrefError> {
    let catalog = Catalog::from_dir(&path)?;
    Ok(Arc::new(ClinrefEngine {
        catalog: CatalogHandle::new(catalog),
    }))
}

/// Age in completed years on `on`; both dates as YYYY-MM-DD.
#[uniffi::export]
pub fn patient_age(date_of_birth: String, on: String) -> Result<u32, ClinrefError> {
    let dob = parse_date(&date_of_birth)?;
    let on = parse_date(&on)?;
    PatientContext::from_birth_date(Gender::Unspecified, dob, on)
        .and_then(|p| p.age_years)
        .ok_or_else(|| ClinrefError::InvalidInput(format!("{} is before date of birth {}", on, dob)))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe engine for FFI. Every call works on one catalog snapshot.
#[derive(uniffi::Object)]
pub struct ClinrefEngine {
    catalog: CatalogHandle,
}

impl ClinrefEngine {
    fn engine(&self) -> Engine {
        Engine::new(self.catalog.current())
    }
}

#[uniffi::export]
impl ClinrefEngine {
    // =========================================================================
    // Reference Data
    // =========================================================================

    /// Convert a value between a test's conventional and SI units.
    pub fn convert(
        &self,
        test_id: String,
        value: f64,
        from_unit: String,
        to_unit: String,
    ) -> Result<f64, ClinrefError> {
        let from = parse_unit(&from_unit)?;
        let to = parse_unit(&to_unit)?;
        Ok(self.engine().convert(&test_id, value, from, to)?)
    }

    /// Get a test definition by id.
    pub fn lookup(&self, test_id: String) -> Result<FfiTestDefinition, ClinrefError> {
        let engine = self.engine();
        let test = engine.lookup(&test_id)?;
        Ok(test.clone().into())
    }

    /// Normal range for a test and gender; `None` when no range applies.
    pub fn normal_range(&self, test_id: String, gender: String) -> Result<Option<FfiRange>, ClinrefError> {
        let gender = parse_gender(&gender)?;
        let range = self.engine().normal_range(&test_id, gender)?;
        Ok(range.map(|r| r.into()))
    }

    /// Search tests by id or name.
    pub fn search_tests(&self, query: String, limit: u32) -> Vec<FfiTestMatch> {
        self.catalog
            .current()
            .search(&query, limit as usize)
            .into_iter()
            .map(|m| m.into())
            .collect()
    }

    // =========================================================================
    // Interpretation
    // =========================================================================

    /// Interpret a value given in the test's conventional unit.
    pub fn interpret(
        &self,
        test_id: String,
        value: f64,
        gender: String,
    ) -> Result<FfiInterpretation, ClinrefError> {
        let gender = parse_gender(&gender)?;
        let result = self.engine().interpret(&test_id, value, gender)?;
        Ok(result.into())
    }

    /// Interpret a value given in either declared unit of the test.
    pub fn interpret_in(
        &self,
        test_id: String,
        value: f64,
        unit: String,
        gender: String,
    ) -> Result<FfiInterpretation, ClinrefError> {
        let unit = parse_unit(&unit)?;
        let gender = parse_gender(&gender)?;
        let result = self.engine().interpret_in(&test_id, value, unit, gender)?;
        Ok(result.into())
    }

    // =========================================================================
    // Formulas
    // =========================================================================

    /// Ids of every registered formula.
    pub fn formula_ids(&self) -> Vec<String> {
        formula::registry().ids().into_iter().map(String::from).collect()
    }

    /// Every registered formula with its family and declared inputs.
    pub fn list_formulas(&self) -> Vec<FfiFormulaInfo> {
        formula::registry().iter().map(FfiFormulaInfo::from).collect()
    }

    /// Evaluate a formula.
    pub fn evaluate_formula(
        &self,
        formula_id: String,
        inputs: HashMap<String, f64>,
        gender: String,
    ) -> Result<FfiEvaluation, ClinrefError> {
        let inputs = build_inputs(inputs, &gender)?;
        let evaluation = self.engine().evaluate(&formula_id, &inputs)?;
        Ok(evaluation.into())
    }

    /// Classify a formula value; for expected-value formulas `value` is the observed measurement.
    pub fn classify_formula(
        &self,
        formula_id: String,
        value: f64,
        inputs: HashMap<String, f64>,
        gender: String,
    ) -> Result<FfiClassification, ClinrefError> {
        let inputs = build_inputs(inputs, &gender)?;
        let classification = self.engine().classify_formula(&formula_id, value, &inputs)?;
        Ok(classification.into())
    }

    // =========================================================================
    // Scoring
    // =========================================================================

    /// Ids of every scoring system in the catalog.
    pub fn scoring_system_ids(&self) -> Vec<String> {
        self.catalog
            .current()
            .scoring_systems()
            .map(|s| s.id.clone())
            .collect()
    }

    /// Score a scoring system and classify the total.
    pub fn score_system(
        &self,
        system_id: String,
        facts: HashMap<String, FfiFact>,
    ) -> Result<FfiAssessment, ClinrefError> {
        let facts: FactMap = facts.into_iter().map(|(k, v)| (k, v.into())).collect();
        let assessment = self.engine().score_system(&system_id, &facts)?;
        Ok(assessment.into())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// SHA-256 fingerprint of the active catalog.
    pub fn catalog_fingerprint(&self) -> String {
        self.catalog.current().fingerprint().to_string()
    }

    pub fn catalog_version(&self) -> String {
        self.catalog.current().version().to_string()
    }

    /// Replace the active catalog with one loaded from `path`. Returns the new fingerprint.
    pub fn reload_from_dir(&self, path: String) -> Result<String, ClinrefError> {
        let catalog = self.catalog.reload(&CatalogSource::Directory(path.into()))?;
        Ok(catalog.fingerprint().to_string())
    }
}

fn build_inputs(values: HashMap<String, f64>, gender: &str) -> Result<Inputs, ClinrefError> {
    let mut inputs = Inputs::new().with_gender(parse_gender(gender)?);
    for (name, value) in values {
        inputs.insert(&name, value);
    }
    Ok(inputs)
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe range.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Display form, e.g. "8.5-10.5" or "<= 200"
    pub display: String,
}

impl From<Range> for FfiRange {
    fn from(range: Range) -> Self {
        Self {
            min: range.min,
            max: range.max,
            display: range.to_string(),
        }
    }
}

/// FFI-safe test definition.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTestDefinition {
    pub id: String,
    pub display_name: String,
    pub localized_name: String,
    pub conventional_unit: String,
    pub si_unit: Option<String>,
    pub si_conversion_factor: Option<f64>,
    pub normal_range: Option<FfiRange>,
    pub male_range: Option<FfiRange>,
    pub female_range: Option<FfiRange>,
    pub critical_low: Option<f64>,
    pub critical_high: Option<f64>,
}

impl From<TestDefinition> for FfiTestDefinition {
    fn from(test: TestDefinition) -> Self {
        let (male_range, female_range) = match test.normal_range_by_gender {
            Some(ranges) => (Some(ranges.male.into()), Some(ranges.female.into())),
            None => (None, None),
        };
        Self {
            id: test.id,
            display_name: test.display_name,
            localized_name: test.localized_name,
            conventional_unit: test.conventional_unit.to_string(),
            si_unit: test.si_unit.map(|u| u.to_string()),
            si_conversion_factor: test.si_conversion_factor,
            normal_range: test.normal_range.map(|r| r.into()),
            male_range,
            female_range,
            critical_low: test.critical_low,
            critical_high: test.critical_high,
        }
    }
}

/// FFI-safe search hit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTestMatch {
    pub test_id: String,
    pub display_name: String,
    pub score: f64,
}

impl From<catalog::TestMatch> for FfiTestMatch {
    fn from(m: catalog::TestMatch) -> Self {
        Self {
            test_id: m.test_id,
            display_name: m.display_name,
            score: m.score,
        }
    }
}

/// FFI-safe interpretation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInterpretation {
    pub test_id: String,
    pub value: f64,
    pub unit: String,
    pub gender: String,
    /// One of critical_low, low, normal, high, critical_high, unscorable
    pub category: String,
    pub is_critical: bool,
    /// Outside the normal range, critical included
    pub is_abnormal: bool,
    pub range_used: Option<FfiRange>,
}

impl From<InterpretationResult> for FfiInterpretation {
    fn from(result: InterpretationResult) -> Self {
        Self {
            test_id: result.test_id,
            value: result.value,
            unit: result.unit.to_string(),
            gender: result.gender.to_string(),
            category: result.category.as_str().to_string(),
            is_critical: result.category.is_critical(),
            is_abnormal: result.category.is_abnormal(),
            range_used: result.range_used.map(|r| r.into()),
        }
    }
}

/// FFI-safe formula description.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFormulaInfo {
    pub id: String,
    pub name: String,
    /// e.g. "ratio", "log_linear"
    pub family: String,
    pub unit: String,
    pub required_inputs: Vec<String>,
    pub optional_inputs: Vec<String>,
}

impl From<&dyn Formula> for FfiFormulaInfo {
    fn from(f: &dyn Formula) -> Self {
        let names = |required: bool| -> Vec<String> {
            f.inputs()
                .iter()
                .filter(|spec| spec.required == required)
                .map(|spec| spec.name.to_string())
                .collect()
        };
        Self {
            id: f.id().to_string(),
            name: f.name().to_string(),
            family: f.family().as_str().to_string(),
            unit: f.unit().to_string(),
            required_inputs: names(true),
            optional_inputs: names(false),
        }
    }
}

/// FFI-safe formula evaluation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEvaluation {
    pub formula_id: String,
    pub value: f64,
    pub unit: String,
    pub tolerance_low: Option<f64>,
    pub tolerance_high: Option<f64>,
}

impl From<formula::Evaluation> for FfiEvaluation {
    fn from(eval: formula::Evaluation) -> Self {
        Self {
            formula_id: eval.formula_id,
            value: eval.value,
            unit: eval.unit,
            tolerance_low: eval.tolerance.map(|t| t.low),
            tolerance_high: eval.tolerance.map(|t| t.high),
        }
    }
}

/// FFI-safe formula classification.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiClassification {
    pub formula_id: String,
    pub value: f64,
    pub category: String,
    pub label: String,
}

impl From<formula::Classification> for FfiClassification {
    fn from(c: formula::Classification) -> Self {
        Self {
            formula_id: c.formula_id,
            value: c.value,
            category: c.category.as_str().to_string(),
            label: c.label,
        }
    }
}

/// FFI-safe clinical fact.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiFact {
    Bool { value: bool },
    Number { value: f64 },
    Text { value: String },
}

impl From<FfiFact> for Fact {
    fn from(fact: FfiFact) -> Self {
        match fact {
            FfiFact::Bool { value } => Fact::Bool(value),
            FfiFact::Number { value } => Fact::Number(value),
            FfiFact::Text { value } => Fact::Text(value),
        }
    }
}

/// FFI-safe fired criterion.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFiredCriterion {
    pub id: String,
    pub label: String,
    pub points: f64,
}

/// FFI-safe scoring assessment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAssessment {
    pub system_id: String,
    pub system_name: String,
    pub total: f64,
    pub fired: Vec<FfiFiredCriterion>,
    pub bucket_label: String,
    pub guidance: String,
}

impl From<models::ScoredAssessment> for FfiAssessment {
    fn from(a: models::ScoredAssessment) -> Self {
        Self {
            system_id: a.system_id,
            system_name: a.system_name,
            total: a.score.total,
            fired: a
                .score
                .fired
                .into_iter()
                .map(|f| FfiFiredCriterion {
                    id: f.id,
                    label: f.label,
                    points: f.points,
                })
                .collect(),
            bucket_label: a.bucket.label,
            guidance: a.bucket.guidance,
        }
    }
}
