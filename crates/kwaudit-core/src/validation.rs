//! Regression suite for the conflict predicate.
//!
//! A fixed table of labeled negative/positive pairs, each covering a known
//! false-positive trap or a must-match case. The runner executes it before
//! touching the account; see [`crate::runner`] for how a failure gates a run.

use serde::{Deserialize, Serialize};

use crate::conflict::conflicts;
use crate::domain::MatchType;

/// One labeled predicate check. The positive is always treated as BROAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCase {
    pub negative_text: String,
    pub negative_match_type: MatchType,
    pub positive_text: String,
    pub expected: bool,
    pub description: String,
}

impl ValidationCase {
    pub fn new(
        negative_text: &str,
        negative_match_type: MatchType,
        positive_text: &str,
        expected: bool,
        description: &str,
    ) -> Self {
        Self {
            negative_text: negative_text.to_string(),
            negative_match_type,
            positive_text: positive_text.to_string(),
            expected,
            description: description.to_string(),
        }
    }
}

/// Result of running one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub case: ValidationCase,
    pub actual: bool,
    pub passed: bool,
}

/// Aggregated suite result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub outcomes: Vec<CaseOutcome>,
}

impl ValidationReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}

/// The built-in regression cases.
pub fn regression_cases() -> Vec<ValidationCase> {
    use MatchType::{Broad, Exact, Phrase};

    vec![
        ValidationCase::new(
            "ed",
            Broad,
            "edwards gsx750",
            false,
            "broad term inside a longer word",
        ),
        ValidationCase::new(
            "medical",
            Broad,
            "medical liquid ring pump",
            true,
            "broad term as a whole word",
        ),
        ValidationCase::new(
            "ac",
            Phrase,
            "nash sc 6 vacuum pump",
            false,
            "short phrase inside 'vacuum'",
        ),
        ValidationCase::new("kd", Phrase, "kinney kdp", false, "short phrase as a word prefix"),
        ValidationCase::new(
            "sc",
            Phrase,
            "nash sc 6 vacuum pump",
            true,
            "short phrase as a whole word",
        ),
        ValidationCase::new("mini", Phrase, "mining vacuum pump", false, "phrase as a word prefix"),
        ValidationCase::new(
            "r5 ra",
            Phrase,
            "busch r5 ra 0025",
            true,
            "multi-word phrase in sequence",
        ),
        ValidationCase::new(
            "a c",
            Phrase,
            "liquid ring ammonia compressor",
            false,
            "phrase spanning partial tokens",
        ),
        ValidationCase::new(
            "ring pump",
            Phrase,
            "pump ring seal",
            false,
            "phrase words out of order",
        ),
        ValidationCase::new(
            "vacuum pump",
            Phrase,
            "liquid ring vacuum pump repair",
            true,
            "phrase inside a longer keyword",
        ),
        ValidationCase::new(
            "busch",
            Exact,
            "busch dolphin la",
            false,
            "exact against a longer keyword",
        ),
        ValidationCase::new(
            "busch dolphin la",
            Exact,
            "busch dolphin la",
            true,
            "exact on identical text",
        ),
        ValidationCase::new("used pump", Broad, "pump used", true, "broad terms in any order"),
        ValidationCase::new("used pump", Broad, "used vacuum", false, "broad terms all required"),
        ValidationCase::new(
            "+rebuilt +kit",
            Broad,
            "rebuilt pump kit",
            true,
            "broad with '+' markers",
        ),
        ValidationCase::new("pump", Broad, "pumps for sale", false, "broad term against a plural"),
    ]
}

/// Run the built-in regression cases.
pub fn run_validation() -> ValidationReport {
    run_cases(&regression_cases())
}

/// Run an arbitrary case table.
pub fn run_cases(cases: &[ValidationCase]) -> ValidationReport {
    let outcomes: Vec<CaseOutcome> = cases
        .iter()
        .map(|case| {
            let actual = conflicts(
                &case.negative_text,
                &case.negative_match_type,
                &case.positive_text,
                &MatchType::Broad,
            );
            if actual != case.expected {
                tracing::warn!(
                    negative = %case.negative_text,
                    match_type = %case.negative_match_type,
                    positive = %case.positive_text,
                    expected = case.expected,
                    actual,
                    "validation case failed: {}",
                    case.description
                );
            }
            CaseOutcome {
                case: case.clone(),
                actual,
                passed: actual == case.expected,
            }
        })
        .collect();

    let passed = outcomes.iter().filter(|o| o.passed).count();
    ValidationReport {
        total: outcomes.len(),
        passed,
        failed: outcomes.len() - passed,
        outcomes,
    }
}
