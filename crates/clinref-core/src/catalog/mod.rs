//! Reference catalog.
//!
//! Immutable set of lab test definitions and scoring systems, validated once
//! when built. A catalog that loads is internally consistent: every test
//! passes its invariants and every risk table covers its scoring system's
//! possible totals.

mod handle;
mod search;
mod validate;

pub use handle::*;
pub use search::*;
pub use validate::*;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::{Gender, Range, ScoringSystem, TestDefinition};

/// File holding lab test definitions.
pub const LAB_TESTS_FILE: &str = "lab_tests.json";
/// File holding scoring systems.
pub const SCORING_SYSTEMS_FILE: &str = "scoring_systems.json";

const EMBEDDED_LAB_TESTS: &str = include_str!("../../data/lab_tests.json");
const EMBEDDED_SCORING_SYSTEMS: &str = include_str!("../../data/scoring_systems.json");

/// Catalog errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Invalid test '{id}': {reason}")]
    InvalidTest { id: String, reason: String },

    #[error("Invalid scoring system '{id}': {reason}")]
    InvalidScoringSystem { id: String, reason: String },

    #[error("Unknown test: {id}{}", did_you_mean(.suggestion))]
    UnknownTest { id: String, suggestion: Option<String> },

    #[error("Unknown scoring system: {0}")]
    UnknownScoringSystem(String),
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Where catalog data comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CatalogSource {
    /// Data compiled into the library
    #[default]
    Embedded,
    /// A directory holding `lab_tests.json` and `scoring_systems.json`
    Directory(PathBuf),
}

#[derive(Deserialize)]
struct LabTestFile {
    #[serde(default)]
    version: String,
    tests: Vec<TestDefinition>,
}

#[derive(Deserialize)]
struct ScoringSystemFile {
    #[serde(default)]
    systems: Vec<ScoringSystem>,
}

/// Content hashed by the fingerprint. Maps keep the encoding order-independent.
#[derive(Serialize)]
struct FingerprintInput<'a> {
    version: &'a str,
    tests: &'a BTreeMap<String, TestDefinition>,
    systems: &'a BTreeMap<String, ScoringSystem>,
}

/// Validated reference data.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    tests: BTreeMap<String, TestDefinition>,
    systems: BTreeMap<String, ScoringSystem>,
    fingerprint: String,
}

impl Catalog {
    /// Build a catalog from definitions, validating each one.
    pub fn from_parts(
        version: &str,
        tests: Vec<TestDefinition>,
        systems: Vec<ScoringSystem>,
    ) -> CatalogResult<Self> {
        let mut test_map = BTreeMap::new();
        for test in tests {
            validate_test(&test)?;
            if test_map.contains_key(&test.id) {
                return Err(CatalogError::DuplicateId(test.id));
            }
            test_map.insert(test.id.clone(), test);
        }

        let mut system_map = BTreeMap::new();
        for system in systems {
            validate_scoring_system(&system)?;
            if system_map.contains_key(&system.id) {
                return Err(CatalogError::DuplicateId(system.id));
            }
            system_map.insert(system.id.clone(), system);
        }

        let fingerprint = fingerprint_of(&FingerprintInput {
            version,
            tests: &test_map,
            systems: &system_map,
        })?;

        Ok(Self {
            version: version.to_string(),
            tests: test_map,
            systems: system_map,
            fingerprint,
        })
    }

    /// Parse and validate the two catalog documents.
    pub fn from_json_str(lab_tests: &str, scoring_systems: &str) -> CatalogResult<Self> {
        let tests: LabTestFile = serde_json::from_str(lab_tests)?;
        let systems: ScoringSystemFile = serde_json::from_str(scoring_systems)?;
        Self::from_parts(&tests.version, tests.tests, systems.systems)
    }

    /// The catalog compiled into the library.
    pub fn embedded() -> CatalogResult<Self> {
        let catalog = Self::from_json_str(EMBEDDED_LAB_TESTS, EMBEDDED_SCORING_SYSTEMS)?;
        catalog.log_loaded("embedded");
        Ok(catalog)
    }

    /// Load `lab_tests.json` and `scoring_systems.json` from a directory.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> CatalogResult<Self> {
        let dir = dir.as_ref();
        let lab_tests = read_file(&dir.join(LAB_TESTS_FILE))?;
        let scoring_systems = read_file(&dir.join(SCORING_SYSTEMS_FILE))?;
        let catalog = Self::from_json_str(&lab_tests, &scoring_systems)?;
        catalog.log_loaded(&dir.display().to_string());
        Ok(catalog)
    }

    pub fn load(source: &CatalogSource) -> CatalogResult<Self> {
        match source {
            CatalogSource::Embedded => Self::embedded(),
            CatalogSource::Directory(dir) => Self::from_dir(dir),
        }
    }

    fn log_loaded(&self, source: &str) {
        tracing::info!(
            source,
            version = %self.version,
            tests = self.tests.len(),
            scoring_systems = self.systems.len(),
            fingerprint = %self.fingerprint,
            "reference catalog loaded"
        );
    }

    /// Get a test definition by id.
    pub fn lookup(&self, id: &str) -> CatalogResult<&TestDefinition> {
        self.tests.get(id).ok_or_else(|| {
            let suggestion = self.suggest(id);
            tracing::warn!(id, suggestion = ?suggestion, "unknown test requested");
            CatalogError::UnknownTest {
                id: id.to_string(),
                suggestion,
            }
        })
    }

    /// Normal range for a test and gender.
    ///
    /// `Ok(None)` means the test exists but has no range for this gender.
    pub fn normal_range(&self, id: &str, gender: Gender) -> CatalogResult<Option<&Range>> {
        Ok(self.lookup(id)?.range_for(gender))
    }

    /// Get a scoring system by id.
    pub fn scoring_system(&self, id: &str) -> CatalogResult<&ScoringSystem> {
        self.systems.get(id).ok_or_else(|| {
            tracing::warn!(id, "unknown scoring system requested");
            CatalogError::UnknownScoringSystem(id.to_string())
        })
    }

    /// All test definitions, ordered by id.
    pub fn tests(&self) -> impl Iterator<Item = &TestDefinition> {
        self.tests.values()
    }

    /// All scoring systems, ordered by id.
    pub fn scoring_systems(&self) -> impl Iterator<Item = &ScoringSystem> {
        self.systems.values()
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// SHA-256 of the catalog content, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn read_file(path: &Path) -> CatalogResult<String> {
    tracing::debug!(path = %path.display(), "reading catalog file");
    fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn fingerprint_of(input: &FingerprintInput<'_>) -> CatalogResult<String> {
    let bytes = serde_json::to_vec(input)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
