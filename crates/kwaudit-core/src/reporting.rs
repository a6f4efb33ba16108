//! Run report artifacts and delivery.
//!
//! The runner hands a finished [`AuditReport`] (or a [`RunFailure`]) to a
//! [`Reporter`]. Rendering beyond JSON and a short markdown summary is left
//! to whatever consumes those artifacts.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{RunWarning, ScopeLevel};
use crate::index::IndexStats;
use crate::metrics::AuditMetrics;
use crate::resolver::ConflictDecision;

/// Validation counts carried in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub validation: ValidationSummary,
    pub index: IndexStats,
    pub metrics: AuditMetrics,
    pub decisions: Vec<ConflictDecision>,
    pub warnings: Vec<RunWarning>,
}

impl AuditReport {
    /// True when the positive index was cut short by the keyword cap.
    pub fn is_partial(&self) -> bool {
        self.index.truncated
    }
}

/// Outcome of an aborted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub failed_at: DateTime<Utc>,
    pub dry_run: bool,
    pub error: String,
    /// Counters at the moment of failure. Removals counted here were committed.
    pub metrics: AuditMetrics,
    pub decisions: Vec<ConflictDecision>,
}

/// Receives run outcomes.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn deliver(&self, report: &AuditReport) -> Result<()>;

    async fn notify_failure(&self, failure: &RunFailure) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Reporters
// ---------------------------------------------------------------------------

/// Logs a one-line summary of each outcome.
#[derive(Debug, Default)]
pub struct LogReporter;

#[async_trait]
impl Reporter for LogReporter {
    async fn deliver(&self, report: &AuditReport) -> Result<()> {
        tracing::info!(
            run_id = %report.run_id,
            found = report.metrics.total_conflicts_found(),
            removed = report.metrics.total_conflicts_removed(),
            false_positives_avoided = report.metrics.false_positives_avoided(),
            warnings = report.warnings.len(),
            "audit complete"
        );
        for warning in &report.warnings {
            tracing::warn!(run_id = %report.run_id, "{}", warning);
        }
        Ok(())
    }

    async fn notify_failure(&self, failure: &RunFailure) -> Result<()> {
        tracing::error!(
            run_id = %failure.run_id,
            error = %failure.error,
            removed_before_failure = failure.metrics.total_conflicts_removed(),
            "audit aborted"
        );
        Ok(())
    }
}

/// Writes `audit_report.json` / `audit_failure.json` into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileReporter {
    dir: PathBuf,
}

impl JsonFileReporter {
    pub const REPORT_FILE: &'static str = "audit_report.json";
    pub const FAILURE_FILE: &'static str = "audit_failure.json";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(Self::REPORT_FILE)
    }

    pub fn failure_path(&self) -> PathBuf {
        self.dir.join(Self::FAILURE_FILE)
    }
}

#[async_trait]
impl Reporter for JsonFileReporter {
    async fn deliver(&self, report: &AuditReport) -> Result<()> {
        write_json(&self.report_path(), report)
    }

    async fn notify_failure(&self, failure: &RunFailure) -> Result<()> {
        write_json(&self.failure_path(), failure)
    }
}

/// Keeps every outcome in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<AuditReport>>,
    failures: Mutex<Vec<RunFailure>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<AuditReport> {
        self.reports
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn failures(&self) -> Vec<RunFailure> {
        self.failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn deliver(&self, report: &AuditReport) -> Result<()> {
        self.reports
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }

    async fn notify_failure(&self, failure: &RunFailure) -> Result<()> {
        self.failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(failure.clone());
        Ok(())
    }
}

/// Write any artifact as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, artifact: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact).context("serialize audit artifact")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

/// Render a short markdown summary of a completed run.
pub fn render_summary_md(report: &AuditReport) -> String {
    let mut out = String::new();
    let mode = if report.dry_run { "dry run" } else { "live" };
    out.push_str(&format!("# Negative Keyword Audit ({})\n\n", mode));
    out.push_str(&format!(
        "- run: `{}`\n- validation: {}/{} passed\n- positives indexed: {}{}\n\n",
        report.run_id,
        report.validation.passed,
        report.validation.total,
        report.index.indexed,
        if report.is_partial() { " (partial)" } else { "" },
    ));

    out.push_str("## Conflicts\n");
    out.push_str("| scope | found | removed |\n|---|---|---|\n");
    for level in [ScopeLevel::AdGroup, ScopeLevel::Campaign, ScopeLevel::SharedList] {
        let counts = report.metrics.scope(level);
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            level, counts.conflicts_found, counts.conflicts_removed
        ));
    }
    out.push_str(&format!(
        "\nFalse positives avoided: {}\n",
        report.metrics.false_positives_avoided()
    ));

    if !report.decisions.is_empty() {
        out.push_str("\n## Decisions\n");
        for d in &report.decisions {
            out.push_str(&format!(
                "- `{}` ({}) in {} blocks `{}` in {} > {}: {}\n",
                d.negative.text,
                d.negative.match_type,
                d.negative.scope.label(),
                d.blocked.text,
                d.blocked.campaign_name,
                d.blocked.ad_group_name,
                d.action.as_str(),
            ));
        }
    }

    if !report.warnings.is_empty() {
        out.push_str("\n## Warnings\n");
        for w in &report.warnings {
            out.push_str(&format!("- {}\n", w));
        }
    }
    out
}
