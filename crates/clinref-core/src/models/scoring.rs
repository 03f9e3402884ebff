//! Rule-based scoring models: facts, criteria, risk buckets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scoring::{ScoringError, ScoringResult};

/// A caller-supplied clinical fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fact {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for Fact {
    fn from(value: bool) -> Self {
        Fact::Bool(value)
    }
}

impl From<f64> for Fact {
    fn from(value: f64) -> Self {
        Fact::Number(value)
    }
}

impl From<&str> for Fact {
    fn from(value: &str) -> Self {
        Fact::Text(value.to_string())
    }
}

/// Facts keyed by name. Absent facts are simply not collected.
pub type FactMap = BTreeMap<String, Fact>;

/// Condition over a fact map.
///
/// A predicate whose fact is absent evaluates to false. A fact of the wrong
/// kind (e.g. text where a number is expected) is an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Boolean fact is true
    IsTrue { fact: String },
    /// Text fact equals value, ignoring case
    Equals { fact: String, value: String },
    /// fact >= value
    AtLeast { fact: String, value: f64 },
    /// fact > value
    Above { fact: String, value: f64 },
    /// fact <= value
    AtMost { fact: String, value: f64 },
    /// fact < value
    Below { fact: String, value: f64 },
    /// min <= fact < max
    InRange { fact: String, min: f64, max: f64 },
    /// Any nested predicate holds
    Any { of: Vec<Predicate> },
    /// Every nested predicate holds
    All { of: Vec<Predicate> },
}

impl Predicate {
    pub fn is_true(fact: &str) -> Self {
        Predicate::IsTrue { fact: fact.into() }
    }

    pub fn at_least(fact: &str, value: f64) -> Self {
        Predicate::AtLeast {
            fact: fact.into(),
            value,
        }
    }

    pub fn below(fact: &str, value: f64) -> Self {
        Predicate::Below {
            fact: fact.into(),
            value,
        }
    }

    pub fn in_range(fact: &str, min: f64, max: f64) -> Self {
        Predicate::InRange {
            fact: fact.into(),
            min,
            max,
        }
    }

    /// Evaluate against the facts.
    pub fn matches(&self, facts: &FactMap) -> ScoringResult<bool> {
        match self {
            Predicate::IsTrue { fact } => match facts.get(fact) {
                None => Ok(false),
                Some(Fact::Bool(b)) => Ok(*b),
                Some(_) => Err(fact_type(fact, "bool")),
            },
            Predicate::Equals { fact, value } => match facts.get(fact) {
                None => Ok(false),
                Some(Fact::Text(t)) => Ok(t.trim().eq_ignore_ascii_case(value.trim())),
                Some(_) => Err(fact_type(fact, "text")),
            },
            Predicate::AtLeast { fact, value } => compare(facts, fact, |x| x >= *value),
            Predicate::Above { fact, value } => compare(facts, fact, |x| x > *value),
            Predicate::AtMost { fact, value } => compare(facts, fact, |x| x <= *value),
            Predicate::Below { fact, value } => compare(facts, fact, |x| x < *value),
            Predicate::InRange { fact, min, max } => compare(facts, fact, |x| x >= *min && x < *max),
            Predicate::Any { of } => {
                for p in of {
                    if p.matches(facts)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::All { of } => {
                if of.is_empty() {
                    return Ok(false);
                }
                for p in of {
                    if !p.matches(facts)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    /// Names of every fact this predicate reads.
    pub fn facts(&self) -> Vec<&str> {
        match self {
            Predicate::IsTrue { fact }
            | Predicate::Equals { fact, .. }
            | Predicate::AtLeast { fact, .. }
            | Predicate::Above { fact, .. }
            | Predicate::AtMost { fact, .. }
            | Predicate::Below { fact, .. }
            | Predicate::InRange { fact, .. } => vec![fact.as_str()],
            Predicate::Any { of } | Predicate::All { of } => {
                of.iter().flat_map(|p| p.facts()).collect()
            }
        }
    }
}

fn compare(facts: &FactMap, fact: &str, test: impl Fn(f64) -> bool) -> ScoringResult<bool> {
    match facts.get(fact) {
        None => Ok(false),
        // NaN compares false everywhere, so it never fires.
        Some(Fact::Number(x)) => Ok(test(*x)),
        Some(_) => Err(fact_type(fact, "number")),
    }
}

fn fact_type(fact: &str, expected: &'static str) -> ScoringError {
    ScoringError::FactType {
        fact: fact.to_string(),
        expected,
    }
}

/// One weighted contributor to a composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    pub label: String,
    pub predicate: Predicate,
    /// Signed point value
    pub points: f64,
    /// Mutually exclusive group; at most one member contributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Criterion {
    pub fn new(id: &str, label: &str, predicate: Predicate, points: f64) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            predicate,
            points,
            group: None,
        }
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }
}

/// One interval of a risk classification table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBucket {
    /// Inclusive lower bound
    pub lower: f64,
    /// Upper bound; `None` means open-ended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
    /// Whether `upper` itself belongs to this bucket
    #[serde(default)]
    pub upper_inclusive: bool,
    pub label: String,
    #[serde(default)]
    pub guidance: String,
}

impl RiskBucket {
    pub fn new(lower: f64, upper: Option<f64>, label: &str, guidance: &str) -> Self {
        Self {
            lower,
            upper,
            upper_inclusive: false,
            label: label.to_string(),
            guidance: guidance.to_string(),
        }
    }

    pub fn contains(&self, total: f64) -> bool {
        if total < self.lower {
            return false;
        }
        match self.upper {
            None => true,
            Some(upper) if self.upper_inclusive => total <= upper,
            Some(upper) => total < upper,
        }
    }
}

/// A named scoring system: criteria plus the table that buckets the total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringSystem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub criteria: Vec<Criterion>,
    pub buckets: Vec<RiskBucket>,
}

impl ScoringSystem {
    /// Lowest and highest totals the criteria can produce.
    ///
    /// Each group contributes at most one member, or nothing.
    pub fn score_range(&self) -> (f64, f64) {
        let mut min = 0.0;
        let mut max = 0.0;
        let mut groups: BTreeMap<&str, (f64, f64)> = BTreeMap::new();

        for criterion in &self.criteria {
            let p = criterion.points;
            match criterion.group.as_deref() {
                Some(group) => {
                    let entry = groups.entry(group).or_insert((0.0, 0.0));
                    entry.0 = entry.0.min(p);
                    entry.1 = entry.1.max(p);
                }
                None => {
                    min += p.min(0.0);
                    max += p.max(0.0);
                }
            }
        }
        for (low, high) in groups.values() {
            min += low;
            max += high;
        }
        (min, max)
    }
}

/// A criterion that contributed to a total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiredCriterion {
    pub id: String,
    pub label: String,
    pub points: f64,
    pub group: Option<String>,
}

/// Output of scoring a criteria list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total: f64,
    /// Fired criteria in declaration order
    pub fired: Vec<FiredCriterion>,
}

/// A scored and classified catalog scoring system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAssessment {
    pub system_id: String,
    pub system_name: String,
    pub score: ScoreResult,
    pub bucket: RiskBucket,
}
