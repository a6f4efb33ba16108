//! Domain models for kwaudit.
//!
//! Canonical definitions for the core entities:
//! - `MatchType` / `KeywordText`: normalized keyword values
//! - `PositiveKeywordRecord` / `NegativeKeywordRecord`: validated platform rows
//! - `AuditConfig`: explicit per-run settings
//! - `AuditError` / `RunWarning`: fatal and non-fatal outcomes

pub mod config;
pub mod error;
pub mod keyword;

pub use config::{AuditConfig, DateRange, DEFAULT_MAX_KEYWORDS};
pub use error::{AuditError, ConfigError, MalformedRecord, Result, RunWarning};
pub use keyword::{
    AdGroupId, CampaignId, KeywordText, MatchType, NegativeKeywordRecord, NegativeScope,
    PositiveKeywordRecord, ScopeLevel, SharedListId, SharedListRef,
};
