//! Patient context models.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Gender used to select gender-specific reference ranges and cutoffs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    /// Not recorded. Only ungendered ranges apply.
    #[default]
    Unspecified,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "" | "unspecified" | "unknown" => Ok(Gender::Unspecified),
            other => Err(format!("unrecognized gender: {}", other)),
        }
    }
}

/// Patient attributes a calculation may depend on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientContext {
    pub gender: Gender,
    /// Age in completed years, if known
    pub age_years: Option<u32>,
}

impl PatientContext {
    pub fn new(gender: Gender) -> Self {
        Self {
            gender,
            age_years: None,
        }
    }

    pub fn with_age(mut self, age_years: u32) -> Self {
        self.age_years = Some(age_years);
        self
    }

    /// Build a context from a date of birth, with age computed on `on`.
    ///
    /// Returns `None` when `on` precedes the date of birth.
    pub fn from_birth_date(gender: Gender, date_of_birth: NaiveDate, on: NaiveDate) -> Option<Self> {
        let age = completed_years(date_of_birth, on)?;
        Some(Self::new(gender).with_age(age))
    }
}

/// Whole years between two dates, counting a birthday only once it is reached.
fn completed_years(from: NaiveDate, to: NaiveDate) -> Option<u32> {
    if to < from {
        return None;
    }
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!("Male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("f".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("".parse::<Gender>().unwrap(), Gender::Unspecified);
        assert!("robot".parse::<Gender>().is_err());
    }

    #[test]
    fn test_age_from_birth_date() {
        let ctx = PatientContext::from_birth_date(Gender::Female, date(1950, 6, 15), date(2025, 6, 14))
            .unwrap();
        assert_eq!(ctx.age_years, Some(74));

        let ctx = PatientContext::from_birth_date(Gender::Female, date(1950, 6, 15), date(2025, 6, 15))
            .unwrap();
        assert_eq!(ctx.age_years, Some(75));
    }

    #[test]
    fn test_future_birth_date_rejected() {
        assert!(PatientContext::from_birth_date(Gender::Male, date(2030, 1, 1), date(2025, 1, 1)).is_none());
    }
}
