//! Audit run coordinator.
//!
//! Sequence: validation suite -> positive index -> ad group scope ->
//! campaign scope -> shared list scope -> report. A failing validation suite
//! aborts a dry run and only warns in live mode. A platform failure aborts
//! the run; removals already made stay made.

use std::time::Instant;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{AuditConfig, AuditError, Result, RunWarning, ScopeLevel};
use crate::index::{IndexStats, PositiveKeywordIndex};
use crate::obs::{self, RunSpan};
use crate::platform::{AdsPlatform, PositiveKeywordQuery};
use crate::reporting::{AuditReport, Reporter, RunFailure, ValidationSummary};
use crate::resolver::{RunTally, ScopeResolver};
use crate::validation::{regression_cases, run_cases, ValidationCase};

/// Runs one audit against a platform.
pub struct AuditRunner<'a, P: AdsPlatform + ?Sized> {
    platform: &'a P,
    config: AuditConfig,
    cases: Vec<ValidationCase>,
}

struct Completed {
    validation: ValidationSummary,
    index: IndexStats,
}

impl<'a, P: AdsPlatform + ?Sized> AuditRunner<'a, P> {
    /// Create a runner. The config is validated here, before any platform call.
    pub fn new(platform: &'a P, config: AuditConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            platform,
            config,
            cases: regression_cases(),
        })
    }

    /// Replace the built-in regression cases.
    pub fn with_validation_cases(mut self, cases: Vec<ValidationCase>) -> Self {
        self.cases = cases;
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Run the audit and hand the outcome to `reporter`.
    ///
    /// On failure the reporter is notified with the counters reached so far
    /// and the original error is returned.
    pub async fn run(&self, reporter: &dyn Reporter) -> Result<AuditReport> {
        let run_id = Uuid::new_v4().to_string();
        let _span = RunSpan::enter(&run_id, self.config.dry_run);
        let started_at = Utc::now();
        let clock = Instant::now();
        obs::emit_run_started(
            &run_id,
            self.config.dry_run,
            self.config.max_keywords_to_process,
        );

        let mut tally = RunTally::default();
        let mut warnings = Vec::new();

        match self.execute(&mut tally, &mut warnings).await {
            Ok(completed) => {
                tally.metrics.flush();
                obs::emit_run_finished(
                    &run_id,
                    clock.elapsed().as_millis() as u64,
                    tally.metrics.total_conflicts_found(),
                    tally.metrics.total_conflicts_removed(),
                );
                let report = AuditReport {
                    run_id,
                    started_at,
                    finished_at: Utc::now(),
                    dry_run: self.config.dry_run,
                    validation: completed.validation,
                    index: completed.index,
                    metrics: tally.metrics,
                    decisions: tally.decisions,
                    warnings,
                };
                reporter
                    .deliver(&report)
                    .await
                    .map_err(|e| AuditError::Report(e.to_string()))?;
                Ok(report)
            }
            Err(err) => {
                obs::emit_run_failed(&run_id, &err);
                let failure = RunFailure {
                    run_id,
                    started_at,
                    failed_at: Utc::now(),
                    dry_run: self.config.dry_run,
                    error: err.to_string(),
                    metrics: tally.metrics,
                    decisions: tally.decisions,
                };
                if let Err(notify_err) = reporter.notify_failure(&failure).await {
                    warn!(error = %notify_err, "failed to deliver failure notification");
                }
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        tally: &mut RunTally,
        warnings: &mut Vec<RunWarning>,
    ) -> Result<Completed> {
        let validation = run_cases(&self.cases);
        obs::emit_validation_completed(validation.total, validation.failed);
        if !validation.all_passed() {
            if self.config.dry_run {
                return Err(AuditError::ValidationFailed {
                    failed: validation.failed,
                    total: validation.total,
                });
            }
            warn!(
                failed = validation.failed,
                "conflict validation failed; continuing because the run is live"
            );
            warnings.push(RunWarning::ValidationFailed {
                failed: validation.failed,
                total: validation.total,
            });
        }

        let query = PositiveKeywordQuery {
            date_range: self.config.date_range,
        };
        let index = PositiveKeywordIndex::build(
            self.platform.positive_keywords(&query),
            self.config.max_keywords_to_process,
        )
        .await?;
        let stats = index.stats();
        obs::emit_index_built(&stats, index.all_texts().len());
        if stats.truncated {
            warnings.push(RunWarning::ProcessingCapReached { limit: stats.limit });
        }

        let resolver = ScopeResolver::new(self.platform, &index, &self.config);

        resolver.resolve_ad_groups(tally).await?;
        obs::emit_scope_finished(ScopeLevel::AdGroup, &tally.metrics.scope(ScopeLevel::AdGroup));

        resolver.resolve_campaigns(tally).await?;
        obs::emit_scope_finished(ScopeLevel::Campaign, &tally.metrics.scope(ScopeLevel::Campaign));

        resolver.resolve_shared_lists(tally).await?;
        obs::emit_scope_finished(
            ScopeLevel::SharedList,
            &tally.metrics.scope(ScopeLevel::SharedList),
        );

        let malformed = stats.skipped_malformed + tally.metrics.malformed_negatives_skipped();
        if malformed > 0 {
            warnings.push(RunWarning::MalformedRecordsSkipped { count: malformed });
        }

        Ok(Completed {
            validation: ValidationSummary {
                total: validation.total,
                passed: validation.passed,
                failed: validation.failed,
            },
            index: stats,
        })
    }
}
