//! Match-type-aware conflict predicate.
//!
//! Decides whether a negative keyword suppresses a positive keyword under
//! the platform's matching rules:
//!
//! - **BROAD**: a single term must appear as a whole word; several terms must
//!   each equal some token of the positive, in any order.
//! - **PHRASE**: the negative's tokens must appear contiguously and in order.
//!   Phrases of two characters or fewer need a whole-word hit on the raw text.
//! - **EXACT**: normalized full-string equality.
//!
//! The positive keyword's own match type does not participate in any branch.
//!
//! [`NegativeMatcher`] also carries the legacy substring rule so callers can
//! count the false positives the word-aware rule avoids.

use regex::Regex;

use crate::domain::{KeywordText, MatchType};

/// Phrase negatives at or below this many characters use word-boundary matching.
pub const SHORT_PHRASE_MAX_CHARS: usize = 2;

/// Returns true when the negative keyword blocks the positive keyword.
///
/// Both texts are normalized first. Blank text and unrecognized negative
/// match types never conflict.
pub fn conflicts(
    negative_text: &str,
    negative_match_type: &MatchType,
    positive_text: &str,
    _positive_match_type: &MatchType,
) -> bool {
    let (Some(negative), Some(positive)) = (
        KeywordText::normalize(negative_text),
        KeywordText::normalize(positive_text),
    ) else {
        return false;
    };
    NegativeMatcher::new(&negative, negative_match_type).conflicts_with(&positive)
}

/// The substring-based rule the predicate replaces.
pub fn legacy_conflicts(
    negative_text: &str,
    negative_match_type: &MatchType,
    positive_text: &str,
) -> bool {
    let (Some(negative), Some(positive)) = (
        KeywordText::normalize(negative_text),
        KeywordText::normalize(positive_text),
    ) else {
        return false;
    };
    NegativeMatcher::new(&negative, negative_match_type).legacy_conflicts_with(&positive)
}

#[derive(Debug, Clone)]
enum Rule {
    WholeWord(Regex),
    AllTerms(Vec<String>),
    Sequence(Vec<String>),
    Equals(String),
    Never,
}

/// A negative keyword compiled once and checked against many positives.
#[derive(Debug, Clone)]
pub struct NegativeMatcher {
    rule: Rule,
    legacy: Legacy,
}

#[derive(Debug, Clone)]
enum Legacy {
    Contains(String),
    TermsInTokens(Vec<String>),
    Equals(String),
    Never,
}

impl NegativeMatcher {
    pub fn new(negative: &KeywordText, match_type: &MatchType) -> Self {
        match match_type {
            MatchType::Broad => {
                let terms = broad_terms(negative);
                let rule = match terms.as_slice() {
                    [] => Rule::Never,
                    [term] => whole_word(term),
                    _ => Rule::AllTerms(terms.clone()),
                };
                Self {
                    rule,
                    legacy: Legacy::TermsInTokens(terms),
                }
            }
            MatchType::Phrase => {
                let rule = if negative.char_len() <= SHORT_PHRASE_MAX_CHARS {
                    whole_word(negative.as_str())
                } else {
                    Rule::Sequence(negative.tokens().map(str::to_string).collect())
                };
                Self {
                    rule,
                    legacy: Legacy::Contains(negative.as_str().to_string()),
                }
            }
            MatchType::Exact => Self {
                rule: Rule::Equals(negative.as_str().to_string()),
                legacy: Legacy::Equals(negative.as_str().to_string()),
            },
            MatchType::Other(_) => Self {
                rule: Rule::Never,
                legacy: Legacy::Never,
            },
        }
    }

    /// Word-aware check.
    pub fn conflicts_with(&self, positive: &KeywordText) -> bool {
        match &self.rule {
            Rule::WholeWord(re) => re.is_match(positive.as_str()),
            Rule::AllTerms(terms) => {
                let tokens: Vec<&str> = positive.tokens().collect();
                terms.iter().all(|term| tokens.contains(&term.as_str()))
            }
            Rule::Sequence(words) => {
                let tokens: Vec<&str> = positive.tokens().collect();
                !words.is_empty()
                    && tokens
                        .windows(words.len())
                        .any(|window| window.iter().zip(words).all(|(t, w)| *t == w.as_str()))
            }
            Rule::Equals(text) => positive.as_str() == text,
            Rule::Never => false,
        }
    }

    /// Substring check kept for false-positive accounting.
    pub fn legacy_conflicts_with(&self, positive: &KeywordText) -> bool {
        match &self.legacy {
            Legacy::Contains(needle) => positive.as_str().contains(needle.as_str()),
            Legacy::TermsInTokens(terms) => {
                !terms.is_empty()
                    && terms
                        .iter()
                        .all(|term| positive.tokens().any(|token| token.contains(term.as_str())))
            }
            Legacy::Equals(text) => positive.as_str() == text,
            Legacy::Never => false,
        }
    }
}

/// Broad terms with the legacy `+` required-word marker removed.
fn broad_terms(negative: &KeywordText) -> Vec<String> {
    negative
        .tokens()
        .map(|token| token.strip_prefix('+').unwrap_or(token))
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// `\b` only holds next to a word character, so punctuation edges
/// (`c++`, `.net`) anchor on whitespace or the ends of the text instead.
fn whole_word(term: &str) -> Rule {
    let lead = if term.starts_with(is_word_char) {
        r"\b"
    } else {
        r"(?:^|\s)"
    };
    let trail = if term.ends_with(is_word_char) {
        r"\b"
    } else {
        r"(?:\s|$)"
    };
    match Regex::new(&format!("{}{}{}", lead, regex::escape(term), trail)) {
        Ok(re) => Rule::WholeWord(re),
        Err(err) => {
            tracing::warn!(term = %term, error = %err, "could not build word-boundary matcher");
            Rule::Never
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(neg: &str, mt: MatchType, pos: &str) -> bool {
        conflicts(neg, &mt, pos, &MatchType::Broad)
    }

    #[test]
    fn broad_single_term_needs_whole_word() {
        assert!(!check("ed", MatchType::Broad, "edwards gsx750"));
        assert!(check("medical", MatchType::Broad, "medical liquid ring pump"));
        assert!(!check("pump", MatchType::Broad, "pumps for sale"));
    }

    #[test]
    fn broad_single_term_strips_plus_marker() {
        assert!(check("+medical", MatchType::Broad, "medical liquid ring pump"));
    }

    #[test]
    fn whole_word_handles_punctuation_edges() {
        assert!(check("c++", MatchType::Broad, "c++"));
        assert!(check("c#", MatchType::Broad, "c# course"));
        assert!(check(".net", MatchType::Broad, "asp .net hosting"));
        assert!(check("c#", MatchType::Phrase, "c# course"));
        assert!(!check("c#", MatchType::Broad, "abc# course"));
        assert!(!check("c#", MatchType::Phrase, "c#x course"));
        assert!(!check(".net", MatchType::Broad, "asp.net hosting"));
        assert!(!check("c++", MatchType::Broad, "c+++ tutorial"));
    }

    #[test]
    fn broad_multi_term_requires_every_term() {
        assert!(check("used pump", MatchType::Broad, "pump used"));
        assert!(!check("used pump", MatchType::Broad, "used vacuum"));
        assert!(check("+rebuilt +kit", MatchType::Broad, "rebuilt pump kit"));
        assert!(!check("ring pump", MatchType::Broad, "ringing pumps"));
    }

    #[test]
    fn broad_of_only_plus_markers_never_conflicts() {
        assert!(!check("+ +", MatchType::Broad, "anything at all"));
    }

    #[test]
    fn short_phrase_uses_word_boundary() {
        assert!(!check("ac", MatchType::Phrase, "nash sc 6 vacuum pump"));
        assert!(!check("kd", MatchType::Phrase, "kinney kdp"));
        assert!(check("sc", MatchType::Phrase, "nash sc 6 vacuum pump"));
    }

    #[test]
    fn phrase_matches_contiguous_tokens() {
        assert!(check("r5 ra", MatchType::Phrase, "busch r5 ra 0025"));
        assert!(!check("a c", MatchType::Phrase, "liquid ring ammonia compressor"));
        assert!(!check("mini", MatchType::Phrase, "mining vacuum pump"));
        assert!(!check("ring pump", MatchType::Phrase, "pump ring seal"));
        assert!(!check("r5 0025", MatchType::Phrase, "busch r5 ra 0025"));
    }

    #[test]
    fn phrase_longer_than_positive_never_matches() {
        assert!(!check("liquid ring pump", MatchType::Phrase, "ring pump"));
    }

    #[test]
    fn exact_requires_full_equality() {
        assert!(!check("busch", MatchType::Exact, "busch dolphin la"));
        assert!(check("busch dolphin la", MatchType::Exact, "busch dolphin la"));
        assert!(check("[Busch Dolphin LA]", MatchType::Exact, " busch  dolphin la"));
    }

    #[test]
    fn unrecognized_match_type_never_conflicts() {
        let other = MatchType::Other("BROAD_MODIFIED".to_string());
        assert!(!check("pump", other.clone(), "pump"));
        assert!(!legacy_conflicts("pump", &other, "pump"));
    }

    #[test]
    fn blank_text_never_conflicts() {
        assert!(!check("", MatchType::Broad, "vacuum pump"));
        assert!(!check("pump", MatchType::Phrase, "   "));
    }

    #[test]
    fn positive_match_type_is_ignored() {
        for positive_mt in [MatchType::Broad, MatchType::Phrase, MatchType::Exact] {
            assert!(conflicts("vacuum", &MatchType::Broad, "vacuum pump", &positive_mt));
            assert!(!conflicts("ed", &MatchType::Broad, "edwards", &positive_mt));
        }
    }

    #[test]
    fn legacy_rule_flags_substrings() {
        assert!(legacy_conflicts("mini", &MatchType::Phrase, "mining vacuum pump"));
        assert!(legacy_conflicts("a c", &MatchType::Phrase, "ammonia compressor a cx"));
        assert!(legacy_conflicts("ed", &MatchType::Broad, "edwards gsx750"));
        assert!(!legacy_conflicts("used pump", &MatchType::Broad, "used vacuum"));
        assert!(!legacy_conflicts("busch", &MatchType::Exact, "busch dolphin la"));
    }

    #[test]
    fn matcher_is_reusable_across_positives() {
        let negative = KeywordText::normalize("vacuum pump").expect("text");
        let matcher = NegativeMatcher::new(&negative, &MatchType::Phrase);
        let hit = KeywordText::normalize("liquid ring vacuum pump repair").expect("text");
        let miss = KeywordText::normalize("vacuum gauge pump").expect("text");
        assert!(matcher.conflicts_with(&hit));
        assert!(!matcher.conflicts_with(&miss));
        assert!(matcher.conflicts_with(&hit));
    }
}
