//! Error taxonomy for kwaudit.

use serde::{Deserialize, Serialize};

use crate::platform::PlatformError;

/// A platform row that lacks the identity fields needed to place it.
///
/// Recovered locally: the row is skipped and counted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    #[error("{kind} keyword missing required field: {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("keyword text is empty after normalization")]
    EmptyText,
}

/// Errors raised while loading or validating an [`AuditConfig`](super::AuditConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_keywords_to_process must be a positive integer")]
    ZeroKeywordCap,

    #[error("date range start {start} is after end {end}")]
    InvertedDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Audit run errors.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("conflict validation failed: {failed} of {total} cases did not pass")]
    ValidationFailed { failed: usize, total: usize },

    #[error("platform operation failed: {0}")]
    Platform(#[from] PlatformError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("report delivery failed: {0}")]
    Report(String),
}

/// Result type for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;

/// Non-fatal conditions surfaced in the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// The regression suite failed but the run continued in live mode.
    ValidationFailed { failed: usize, total: usize },
    /// Positive ingestion stopped at the configured cap; results are partial.
    ProcessingCapReached { limit: u64 },
    /// Rows without identity fields were skipped.
    MalformedRecordsSkipped { count: u64 },
}

impl std::fmt::Display for RunWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValidationFailed { failed, total } => write!(
                f,
                "conflict validation failed ({} of {} cases); proceeded in live mode",
                failed, total
            ),
            Self::ProcessingCapReached { limit } => write!(
                f,
                "positive keyword cap of {} reached; results are partial",
                limit
            ),
            Self::MalformedRecordsSkipped { count } => {
                write!(f, "{} malformed keyword rows skipped", count)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_failed_display() {
        let err = AuditError::ValidationFailed {
            failed: 2,
            total: 16,
        };
        let msg = err.to_string();
        assert!(msg.contains("conflict validation failed"));
        assert!(msg.contains("2 of 16"));
    }

    #[test]
    fn test_platform_error_wraps() {
        let err: AuditError = PlatformError::Removal {
            keyword: "ed".to_string(),
            reason: "quota exhausted".to_string(),
        }
        .into();
        assert!(err.to_string().contains("platform operation failed"));
        assert!(err.to_string().contains("quota exhausted"));
    }

    #[test]
    fn test_malformed_record_display() {
        let err = MalformedRecord::MissingField {
            kind: "positive",
            field: "ad_group_id",
        };
        assert_eq!(
            err.to_string(),
            "positive keyword missing required field: ad_group_id"
        );
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let warning = RunWarning::ProcessingCapReached { limit: 500 };
        let json = serde_json::to_value(&warning).expect("serialize");
        assert_eq!(json["kind"], "processing_cap_reached");
        assert_eq!(json["limit"], 500);
        assert!(warning.to_string().contains("partial"));
    }
}
