//! Run configuration.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Default cap on positive keywords ingested per run.
pub const DEFAULT_MAX_KEYWORDS: u64 = 50_000;

/// Inclusive date window used to scope positive keyword enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Settings for one audit run. Passed explicitly to the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// When true, conflicts are reported but nothing is removed.
    pub dry_run: bool,

    /// Log every negative checked, not just the conflicts.
    pub detailed_logging: bool,

    /// Only consider positives active inside this window.
    pub date_range: Option<DateRange>,

    /// Stop ingesting positives after this many rows.
    pub max_keywords_to_process: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            detailed_logging: false,
            date_range: None,
            max_keywords_to_process: DEFAULT_MAX_KEYWORDS,
        }
    }
}

impl AuditConfig {
    /// Parse a TOML document. The result is validated.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_keywords_to_process == 0 {
            return Err(ConfigError::ZeroKeywordCap);
        }
        if let Some(range) = self.date_range {
            if range.start > range.end {
                return Err(ConfigError::InvertedDateRange {
                    start: range.start,
                    end: range.end,
                });
            }
        }
        Ok(())
    }
}
