//! Structured observability hooks for audit run lifecycle events.
//!
//! This module provides:
//! - Run-scoped tracing spans via the `RunSpan` RAII guard
//! - Emission functions for key events: start, validation, index build,
//!   per-negative decisions, scope completion, finish and failure
//!
//! Events are emitted at `info!` level; per-negative detail lines are
//! `debug!` and only emitted when detailed logging is enabled.

use tracing::{debug, info, warn};

use crate::domain::{MatchType, NegativeKeywordRecord, PositiveKeywordRecord, ScopeLevel};
use crate::index::IndexStats;
use crate::metrics::ScopeCounts;

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run_id.
    pub fn enter(run_id: &str, dry_run: bool) -> Self {
        let span = tracing::info_span!("kwaudit.run", run_id = %run_id, dry_run = dry_run);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_run_started(run_id: &str, dry_run: bool, max_keywords: u64) {
    info!(event = "run.started", run_id = %run_id, dry_run, max_keywords);
}

pub fn emit_validation_completed(total: usize, failed: usize) {
    if failed == 0 {
        info!(event = "validation.completed", total, failed, passed = true);
    } else {
        warn!(event = "validation.completed", total, failed, passed = false);
    }
}

pub fn emit_index_built(stats: &IndexStats, distinct_texts: usize) {
    info!(
        event = "index.built",
        indexed = stats.indexed,
        distinct_texts,
        skipped_malformed = stats.skipped_malformed,
        truncated = stats.truncated,
    );
}

/// Emit event: a negative blocks a positive.
pub fn emit_conflict(
    level: ScopeLevel,
    negative: &NegativeKeywordRecord,
    positive: &PositiveKeywordRecord,
    action: &str,
) {
    info!(
        event = "scope.decision",
        scope = %level,
        location = %negative.scope.label(),
        negative = %negative.text,
        negative_match_type = %negative.match_type,
        positive = %positive.text,
        positive_match_type = %positive.match_type,
        positive_ad_group = %positive.ad_group_name,
        action = %action,
    );
}

/// Emit detail: a negative was checked and blocks nothing.
pub fn emit_no_conflict(level: ScopeLevel, negative: &NegativeKeywordRecord, candidates: usize) {
    debug!(
        event = "scope.no_conflict",
        scope = %level,
        negative = %negative.text,
        negative_match_type = %negative.match_type,
        candidates,
    );
}

/// Emit detail: the substring rule would have flagged this negative.
pub fn emit_false_positive_avoided(level: ScopeLevel, text: &str, match_type: &MatchType) {
    debug!(
        event = "scope.false_positive_avoided",
        scope = %level,
        negative = %text,
        negative_match_type = %match_type,
    );
}

pub fn emit_scope_finished(level: ScopeLevel, counts: &ScopeCounts) {
    info!(
        event = "scope.finished",
        scope = %level,
        checked = counts.checked,
        found = counts.conflicts_found,
        removed = counts.conflicts_removed,
    );
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, found: u64, removed: u64) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms,
        found,
        removed,
    );
}

/// Emit event: run aborted (error level).
pub fn emit_run_failed(run_id: &str, error: &dyn std::fmt::Display) {
    tracing::error!(event = "run.failed", run_id = %run_id, error = %error);
}
