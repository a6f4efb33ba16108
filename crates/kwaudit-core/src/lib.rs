//! kwaudit Core Library
//!
//! Detects negative keywords that block an account's own positive keywords
//! and optionally removes them. Re-exports the pieces needed to run an audit
//! programmatically.

pub mod conflict;
pub mod domain;
pub mod index;
pub mod metrics;
pub mod obs;
pub mod platform;
pub mod reporting;
pub mod resolver;
pub mod runner;
pub mod telemetry;
pub mod validation;

pub use conflict::{conflicts, legacy_conflicts, NegativeMatcher};

pub use domain::{
    AdGroupId, AuditConfig, AuditError, CampaignId, ConfigError, DateRange, KeywordText,
    MalformedRecord, MatchType, NegativeKeywordRecord, NegativeScope, PositiveKeywordRecord,
    Result, RunWarning, ScopeLevel, SharedListId, SharedListRef,
};

pub use index::{IndexStats, PositiveKeywordIndex};
pub use metrics::{AuditMetrics, ScopeCounts};
pub use platform::{
    AccountSnapshot, AdsPlatform, MemoryPlatform, NegativeKeywordRow, PlatformError,
    PlatformResult, PositiveKeywordQuery, PositiveKeywordRow, SharedListSnapshot,
};
pub use reporting::{
    render_summary_md, AuditReport, JsonFileReporter, LogReporter, RecordingReporter, Reporter,
    RunFailure, ValidationSummary,
};
pub use resolver::{ConflictDecision, DecisionAction, RunTally, ScopeResolver};
pub use runner::AuditRunner;
pub use telemetry::init_tracing;
pub use validation::{
    regression_cases, run_cases, run_validation, CaseOutcome, ValidationCase, ValidationReport,
};

/// kwaudit version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
