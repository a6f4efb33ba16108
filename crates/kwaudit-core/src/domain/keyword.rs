//! Keyword value types shared by every stage of an audit run.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::MalformedRecord;

// ---------------------------------------------------------------------------
// Match types
// ---------------------------------------------------------------------------

/// Keyword match type as reported by the advertising platform.
///
/// Anything outside BROAD/PHRASE/EXACT is kept verbatim in [`MatchType::Other`]
/// so it can be reported; the conflict predicate never matches on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchType {
    Broad,
    Phrase,
    Exact,
    Other(String),
}

impl MatchType {
    /// Parse a platform match-type label. Case-insensitive.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "BROAD" => Self::Broad,
            "PHRASE" => Self::Phrase,
            "EXACT" => Self::Exact,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Broad => "BROAD",
            Self::Phrase => "PHRASE",
            Self::Exact => "EXACT",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for MatchType {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<MatchType> for String {
    fn from(mt: MatchType) -> Self {
        mt.as_str().to_string()
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Keyword text
// ---------------------------------------------------------------------------

/// Normalized keyword text: lowercased, trimmed, single-space separated.
///
/// Platform exports sometimes decorate text with its match type (`"foo"`,
/// `[foo]`); one enclosing pair is removed. A leading `+` on broad terms is
/// kept here and handled by the predicate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeywordText(String);

impl KeywordText {
    /// Normalize `raw`. Returns `None` when nothing is left.
    pub fn normalize(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        let unwrapped = strip_decoration(&lowered);
        let joined = unwrapped.split_whitespace().collect::<Vec<_>>().join(" ");
        if joined.is_empty() {
            None
        } else {
            Some(Self(joined))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whitespace-delimited tokens.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ')
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

fn strip_decoration(text: &str) -> &str {
    let pairs = [('"', '"'), ('[', ']')];
    for (open, close) in pairs {
        if text.len() >= 2 && text.starts_with(open) && text.ends_with(close) {
            let inner = &text[1..text.len() - 1];
            if !inner.contains(open) && !inner.contains(close) {
                return inner;
            }
        }
    }
    text
}

impl TryFrom<String> for KeywordText {
    type Error = MalformedRecord;

    fn try_from(raw: String) -> std::result::Result<Self, Self::Error> {
        Self::normalize(&raw).ok_or(MalformedRecord::EmptyText)
    }
}

impl From<KeywordText> for String {
    fn from(text: KeywordText) -> Self {
        text.0
    }
}

impl fmt::Display for KeywordText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Platform campaign identifier.
    CampaignId
);
string_id!(
    /// Platform ad group identifier.
    AdGroupId
);
string_id!(
    /// Platform shared negative keyword list identifier.
    SharedListId
);

/// A shared negative keyword list as enumerated by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedListRef {
    pub id: SharedListId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One enabled keyword the advertiser bids on, captured at index-build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositiveKeywordRecord {
    pub text: KeywordText,
    pub match_type: MatchType,
    pub campaign_id: CampaignId,
    pub campaign_name: String,
    pub ad_group_id: AdGroupId,
    pub ad_group_name: String,
}

/// Where a negative keyword is defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum NegativeScope {
    AdGroup {
        campaign_id: CampaignId,
        campaign_name: String,
        ad_group_id: AdGroupId,
        ad_group_name: String,
    },
    Campaign {
        campaign_id: CampaignId,
        campaign_name: String,
    },
    SharedList {
        list_id: SharedListId,
        list_name: String,
    },
}

impl NegativeScope {
    pub fn level(&self) -> ScopeLevel {
        match self {
            Self::AdGroup { .. } => ScopeLevel::AdGroup,
            Self::Campaign { .. } => ScopeLevel::Campaign,
            Self::SharedList { .. } => ScopeLevel::SharedList,
        }
    }

    /// Human-readable location, e.g. `Brand > Pumps`.
    pub fn label(&self) -> String {
        match self {
            Self::AdGroup {
                campaign_name,
                ad_group_name,
                ..
            } => format!("{} > {}", campaign_name, ad_group_name),
            Self::Campaign { campaign_name, .. } => campaign_name.clone(),
            Self::SharedList { list_name, .. } => format!("shared list '{}'", list_name),
        }
    }
}

/// Organizational level at which negatives are defined and evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeLevel {
    AdGroup,
    Campaign,
    SharedList,
}

impl ScopeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdGroup => "ad_group",
            Self::Campaign => "campaign",
            Self::SharedList => "shared_list",
        }
    }
}

impl fmt::Display for ScopeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A negative keyword that may be flagged and removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeKeywordRecord {
    pub text: KeywordText,
    pub match_type: MatchType,
    pub scope: NegativeScope,
}
