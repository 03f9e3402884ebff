//! Measurement units.
//!
//! Units form a closed set. Each test declares at most one
//! (conventional, SI) pair drawn from it, checked when the catalog loads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A laboratory measurement unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "mg/dL")]
    MgPerDl,
    #[serde(rename = "mg/L")]
    MgPerL,
    #[serde(rename = "g/dL")]
    GPerDl,
    #[serde(rename = "g/L")]
    GPerL,
    #[serde(rename = "mmol/L")]
    MmolPerL,
    #[serde(rename = "mEq/L")]
    MeqPerL,
    #[serde(rename = "µmol/L", alias = "umol/L")]
    UmolPerL,
    #[serde(rename = "ng/mL")]
    NgPerMl,
    #[serde(rename = "µg/L", alias = "ug/L")]
    UgPerL,
    #[serde(rename = "pg/mL")]
    PgPerMl,
    #[serde(rename = "pmol/L")]
    PmolPerL,
    #[serde(rename = "mIU/L")]
    MiuPerL,
    #[serde(rename = "U/L")]
    UPerL,
    #[serde(rename = "µkat/L", alias = "ukat/L")]
    UkatPerL,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "L/L")]
    LPerL,
    #[serde(rename = "10^3/µL", alias = "10^3/uL")]
    ThousandPerUl,
    #[serde(rename = "10^9/L")]
    GigaPerL,
    #[serde(rename = "10^6/µL", alias = "10^6/uL")]
    MillionPerUl,
    #[serde(rename = "10^12/L")]
    TeraPerL,
    #[serde(rename = "mmHg")]
    MmHg,
    #[serde(rename = "kPa")]
    KPa,
    #[serde(rename = "ratio")]
    Ratio,
}

impl Unit {
    pub const ALL: [Unit; 23] = [
        Unit::MgPerDl,
        Unit::MgPerL,
        Unit::GPerDl,
        Unit::GPerL,
        Unit::MmolPerL,
        Unit::MeqPerL,
        Unit::UmolPerL,
        Unit::NgPerMl,
        Unit::UgPerL,
        Unit::PgPerMl,
        Unit::PmolPerL,
        Unit::MiuPerL,
        Unit::UPerL,
        Unit::UkatPerL,
        Unit::Percent,
        Unit::LPerL,
        Unit::ThousandPerUl,
        Unit::GigaPerL,
        Unit::MillionPerUl,
        Unit::TeraPerL,
        Unit::MmHg,
        Unit::KPa,
        Unit::Ratio,
    ];

    /// Display symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::MgPerDl => "mg/dL",
            Unit::MgPerL => "mg/L",
            Unit::GPerDl => "g/dL",
            Unit::GPerL => "g/L",
            Unit::MmolPerL => "mmol/L",
            Unit::MeqPerL => "mEq/L",
            Unit::UmolPerL => "µmol/L",
            Unit::NgPerMl => "ng/mL",
            Unit::UgPerL => "µg/L",
            Unit::PgPerMl => "pg/mL",
            Unit::PmolPerL => "pmol/L",
            Unit::MiuPerL => "mIU/L",
            Unit::UPerL => "U/L",
            Unit::UkatPerL => "µkat/L",
            Unit::Percent => "%",
            Unit::LPerL => "L/L",
            Unit::ThousandPerUl => "10^3/µL",
            Unit::GigaPerL => "10^9/L",
            Unit::MillionPerUl => "10^6/µL",
            Unit::TeraPerL => "10^12/L",
            Unit::MmHg => "mmHg",
            Unit::KPa => "kPa",
            Unit::Ratio => "ratio",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = String;

    /// Parse a unit symbol. Matching ignores case and accepts `u`/`mc` for `µ`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = canonical_symbol(s);
        Unit::ALL
            .iter()
            .copied()
            .find(|u| canonical_symbol(u.symbol()) == wanted)
            .ok_or_else(|| format!("unknown unit: {}", s))
    }
}

fn canonical_symbol(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .replace("mcmol", "µmol")
        .replace("mcg", "µg")
        .replace("umol", "µmol")
        .replace("ug/", "µg/")
        .replace("ukat", "µkat")
        .replace("/ul", "/µl")
        .replace(' ', "")
}
