//! Reference engine.
//!
//! Pipeline: Catalog → (Converter, Interpreter) → InterpretationResult
//!
//! The engine is a thin coordinator over an immutable catalog snapshot, the
//! built-in formula registry and the scoring functions. Every call is pure.

mod converter;
mod interpreter;

pub use converter::*;
pub use interpreter::*;

use std::sync::Arc;

use thiserror::Error;

use crate::catalog::{Catalog, CatalogError};
use crate::formula::{self, Classification, Evaluation, FormulaError, FormulaRegistry, Inputs};
use crate::models::{
    Criterion, FactMap, Gender, InterpretationResult, Range, RiskBucket, ScoreResult, ScoredAssessment,
    TestDefinition, Unit,
};
use crate::scoring::{self, ScoringError};

/// Engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Unsupported conversion for {test_id}: {from} -> {to}")]
    UnsupportedConversion { test_id: String, from: Unit, to: Unit },

    #[error("Cannot convert non-finite value {value} for {test_id}")]
    NonFiniteValue { test_id: String, value: f64 },

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Entry point for conversions, interpretations, formulas and scores.
pub struct Engine {
    catalog: Arc<Catalog>,
    formulas: &'static FormulaRegistry,
}

impl Engine {
    /// Create an engine over a catalog snapshot.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            formulas: formula::registry(),
        }
    }

    /// Engine over the embedded catalog.
    pub fn embedded() -> EngineResult<Self> {
        Ok(Self::new(Arc::new(Catalog::embedded()?)))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn formulas(&self) -> &FormulaRegistry {
        self.formulas
    }

    pub fn converter(&self) -> Converter<'_> {
        Converter::new(&self.catalog)
    }

    pub fn interpreter(&self) -> Interpreter<'_> {
        Interpreter::new(&self.catalog)
    }

    // =========================================================================
    // Reference data
    // =========================================================================

    pub fn lookup(&self, test_id: &str) -> EngineResult<&TestDefinition> {
        Ok(self.catalog.lookup(test_id)?)
    }

    pub fn normal_range(&self, test_id: &str, gender: Gender) -> EngineResult<Option<Range>> {
        Ok(self.catalog.normal_range(test_id, gender)?.copied())
    }

    pub fn convert(&self, test_id: &str, value: f64, from: Unit, to: Unit) -> EngineResult<f64> {
        self.converter().convert(test_id, value, from, to)
    }

    pub fn interpret(&self, test_id: &str, value: f64, gender: Gender) -> EngineResult<InterpretationResult> {
        self.interpreter().interpret(test_id, value, gender)
    }

    pub fn interpret_in(
        &self,
        test_id: &str,
        value: f64,
        unit: Unit,
        gender: Gender,
    ) -> EngineResult<InterpretationResult> {
        self.interpreter().interpret_in(test_id, value, unit, gender)
    }

    // =========================================================================
    // Formulas
    // =========================================================================

    pub fn evaluate(&self, formula_id: &str, inputs: &Inputs) -> EngineResult<Evaluation> {
        Ok(self.formulas.evaluate(formula_id, inputs)?)
    }

    pub fn classify_formula(&self, formula_id: &str, value: f64, inputs: &Inputs) -> EngineResult<Classification> {
        Ok(self.formulas.classify(formula_id, value, inputs)?)
    }

    // =========================================================================
    // Scoring
    // =========================================================================

    pub fn score(&self, criteria: &[Criterion], facts: &FactMap) -> EngineResult<ScoreResult> {
        Ok(scoring::score(criteria, facts)?)
    }

    pub fn classify_total<'b>(&self, total: f64, buckets: &'b [RiskBucket]) -> EngineResult<&'b RiskBucket> {
        Ok(scoring::classify(total, buckets)?)
    }

    /// Score a catalog scoring system and classify the total.
    pub fn score_system(&self, system_id: &str, facts: &FactMap) -> EngineResult<ScoredAssessment> {
        let system = self.catalog.scoring_system(system_id)?;
        Ok(scoring::assess(system, facts)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Fact, Predicate};

    fn engine() -> Engine {
        Engine::embedded().unwrap()
    }

    #[test]
    fn test_facade_reference_data() {
        let engine = engine();
        assert_eq!(engine.lookup("calcium").unwrap().display_name, "Calcium");
        assert_eq!(
            engine.normal_range("calcium", Gender::Male).unwrap(),
            Some(Range::between(8.5, 10.5))
        );
        let si = engine.convert("calcium", 10.0, Unit::MgPerDl, Unit::MmolPerL).unwrap();
        assert!((si - 2.495).abs() < 1e-9);
    }

    #[test]
    fn test_facade_interpret() {
        let engine = engine();
        let result = engine.interpret("potassium", 7.0, Gender::Female).unwrap();
        assert_eq!(result.category, Category::CriticalHigh);

        let result = engine
            .interpret_in("hemoglobin", 110.0, Unit::GPerL, Gender::Female)
            .unwrap();
        assert_eq!(result.category, Category::Low);
    }

    #[test]
    fn test_facade_formulas() {
        let engine = engine();
        let inputs = Inputs::new().with("bun", 40.0).with("creatinine", 1.0);
        let eval = engine.evaluate("bun_creatinine_ratio", &inputs).unwrap();
        assert_eq!(eval.value, 40.0);
        let c = engine.classify_formula("bun_creatinine_ratio", eval.value, &inputs).unwrap();
        assert_eq!(c.category, Category::High);

        let err = engine.evaluate("nope", &inputs).unwrap_err();
        assert!(matches!(err, EngineError::Formula(FormulaError::UnknownFormula(_))));
    }

    #[test]
    fn test_facade_ad_hoc_scoring() {
        let engine = engine();
        let criteria = vec![
            Criterion::new("a", "A", Predicate::is_true("a"), 2.0),
            Criterion::new("b", "B", Predicate::is_true("b"), 1.0),
        ];
        let facts: FactMap = [("a".to_string(), Fact::Bool(true))].into_iter().collect();
        let result = engine.score(&criteria, &facts).unwrap();
        assert_eq!(result.total, 2.0);

        let buckets = vec![
            RiskBucket::new(0.0, Some(2.0), "Low", ""),
            RiskBucket::new(2.0, Some(4.0), "High", ""),
        ];
        assert_eq!(engine.classify_total(result.total, &buckets).unwrap().label, "High");
        let err = engine.classify_total(4.0, &buckets).unwrap_err();
        assert!(matches!(err, EngineError::Scoring(ScoringError::ScaleExceeded { .. })));
    }

    #[test]
    fn test_facade_score_system() {
        let engine = engine();
        let facts: FactMap = [
            ("age".to_string(), Fact::Number(72.0)),
            ("hypertension".to_string(), Fact::Bool(true)),
        ]
        .into_iter()
        .collect();
        let assessment = engine.score_system("cha2ds2_vasc", &facts).unwrap();
        assert_eq!(assessment.score.total, 2.0);
        assert_eq!(assessment.bucket.label, "High");

        let err = engine.score_system("nope", &facts).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Catalog(CatalogError::UnknownScoringSystem(_))
        ));
    }
}
