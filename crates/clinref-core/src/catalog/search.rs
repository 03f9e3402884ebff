//! Fuzzy test search over ids, display names and localized names.

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::models::TestDefinition;

use super::Catalog;

/// Minimum similarity for a search hit.
const MIN_SEARCH_SCORE: f64 = 0.6;
/// Minimum similarity for a "did you mean" suggestion.
const MIN_SUGGESTION_SCORE: f64 = 0.8;

/// A test matched by [`Catalog::search`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMatch {
    pub test_id: String,
    pub display_name: String,
    /// Similarity, 0.0 - 1.0
    pub score: f64,
}

impl Catalog {
    /// Find tests whose id or names resemble `query`, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<TestMatch> {
        let query = query.trim().to_lowercase();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut matches: Vec<TestMatch> = self
            .tests()
            .map(|test| (test, match_score(test, &query)))
            .filter(|(_, score)| *score >= MIN_SEARCH_SCORE)
            .map(|(test, score)| TestMatch {
                test_id: test.id.clone(),
                display_name: test.display_name.clone(),
                score,
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.test_id.cmp(&b.test_id)));
        matches.truncate(limit);
        matches
    }

    /// Closest test id to a mistyped one, if any is close enough.
    pub(crate) fn suggest(&self, id: &str) -> Option<String> {
        self.search(id, 1)
            .into_iter()
            .find(|m| m.score >= MIN_SUGGESTION_SCORE)
            .map(|m| m.test_id)
    }
}

/// Score how well `query` (lowercased) names `test` (0.0 - 1.0).
fn match_score(test: &TestDefinition, query: &str) -> f64 {
    let names = [
        test.id.to_lowercase(),
        test.display_name.to_lowercase(),
        test.localized_name.to_lowercase(),
    ];

    // Exact id, or a substring of a name
    if names[0] == query || names[1..].iter().any(|n| !n.is_empty() && n.contains(query)) {
        return 1.0;
    }

    names
        .iter()
        .filter(|n| !n.is_empty())
        .map(|n| fuzzy_match(query, n))
        .fold(0.0, f64::max)
}

/// Combined string similarity: Jaro-Winkler for typos and prefixes, Levenshtein overall.
fn fuzzy_match(a: &str, b: &str) -> f64 {
    let jw = jaro_winkler(a, b);
    let lev = normalized_levenshtein(a, b);
    jw * 0.6 + lev * 0.4
}
