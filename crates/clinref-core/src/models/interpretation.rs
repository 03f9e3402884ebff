//! Interpretation result models.

use serde::{Deserialize, Serialize};

use super::{Gender, Range, Unit};

/// Classification of a value against its reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CriticalLow,
    Low,
    Normal,
    High,
    CriticalHigh,
    /// No usable reference data. Distinct from `Normal`.
    Unscorable,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CriticalLow => "critical_low",
            Category::Low => "low",
            Category::Normal => "normal",
            Category::High => "high",
            Category::CriticalHigh => "critical_high",
            Category::Unscorable => "unscorable",
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Category::CriticalLow | Category::CriticalHigh)
    }

    /// Outside the normal range (critical included).
    pub fn is_abnormal(&self) -> bool {
        matches!(
            self,
            Category::CriticalLow | Category::Low | Category::High | Category::CriticalHigh
        )
    }
}

/// Result of interpreting one value against one test definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpretationResult {
    pub test_id: String,
    /// Value in the test's conventional unit
    pub value: f64,
    pub unit: Unit,
    pub gender: Gender,
    pub category: Category,
    /// The normal range actually applied, for display
    pub range_used: Option<Range>,
}
