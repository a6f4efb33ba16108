//! Run-scoped conflict counters.
//!
//! One [`AuditMetrics`] is owned by the runner for the whole run. Resolvers
//! receive `&mut` access and can only increment; nothing outside the crate
//! can change a counter. Call [`AuditMetrics::flush`] to emit current values
//! as a single `tracing::info!` event.

use serde::{Deserialize, Serialize};

use crate::domain::ScopeLevel;

/// Found/removed counts for one scope level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeCounts {
    /// Negatives evaluated against their candidate positives.
    pub checked: u64,
    /// Negatives that block at least one positive.
    pub conflicts_found: u64,
    /// Conflicting negatives removed from the platform.
    pub conflicts_removed: u64,
}

/// Counters accumulated over one audit run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetrics {
    ad_group: ScopeCounts,
    campaign: ScopeCounts,
    shared_list: ScopeCounts,
    false_positives_avoided: u64,
    malformed_negatives_skipped: u64,
    shared_lists_skipped: u64,
}

impl AuditMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counts_mut(&mut self, level: ScopeLevel) -> &mut ScopeCounts {
        match level {
            ScopeLevel::AdGroup => &mut self.ad_group,
            ScopeLevel::Campaign => &mut self.campaign,
            ScopeLevel::SharedList => &mut self.shared_list,
        }
    }

    pub(crate) fn inc_checked(&mut self, level: ScopeLevel) {
        self.counts_mut(level).checked += 1;
    }

    pub(crate) fn inc_found(&mut self, level: ScopeLevel) {
        self.counts_mut(level).conflicts_found += 1;
        tracing::trace!(metric = "conflicts_found", scope = %level, "counter incremented");
    }

    pub(crate) fn inc_removed(&mut self, level: ScopeLevel) {
        self.counts_mut(level).conflicts_removed += 1;
        tracing::trace!(metric = "conflicts_removed", scope = %level, "counter incremented");
    }

    pub(crate) fn inc_false_positives_avoided(&mut self) {
        self.false_positives_avoided += 1;
    }

    pub(crate) fn inc_malformed_negatives(&mut self) {
        self.malformed_negatives_skipped += 1;
    }

    pub(crate) fn inc_shared_lists_skipped(&mut self) {
        self.shared_lists_skipped += 1;
    }

    pub fn scope(&self, level: ScopeLevel) -> ScopeCounts {
        match level {
            ScopeLevel::AdGroup => self.ad_group,
            ScopeLevel::Campaign => self.campaign,
            ScopeLevel::SharedList => self.shared_list,
        }
    }

    pub fn ad_group_conflicts_found(&self) -> u64 {
        self.ad_group.conflicts_found
    }

    pub fn ad_group_conflicts_removed(&self) -> u64 {
        self.ad_group.conflicts_removed
    }

    pub fn campaign_conflicts_found(&self) -> u64 {
        self.campaign.conflicts_found
    }

    pub fn campaign_conflicts_removed(&self) -> u64 {
        self.campaign.conflicts_removed
    }

    pub fn shared_list_conflicts_found(&self) -> u64 {
        self.shared_list.conflicts_found
    }

    pub fn shared_list_conflicts_removed(&self) -> u64 {
        self.shared_list.conflicts_removed
    }

    pub fn total_conflicts_found(&self) -> u64 {
        self.ad_group.conflicts_found
            + self.campaign.conflicts_found
            + self.shared_list.conflicts_found
    }

    pub fn total_conflicts_removed(&self) -> u64 {
        self.ad_group.conflicts_removed
            + self.campaign.conflicts_removed
            + self.shared_list.conflicts_removed
    }

    /// Negatives the substring rule would have flagged but the word-aware
    /// predicate did not. Counted once per negative.
    pub fn false_positives_avoided(&self) -> u64 {
        self.false_positives_avoided
    }

    pub fn malformed_negatives_skipped(&self) -> u64 {
        self.malformed_negatives_skipped
    }

    /// Shared lists skipped because no campaign is attached.
    pub fn shared_lists_skipped(&self) -> u64 {
        self.shared_lists_skipped
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            ad_group_found = self.ad_group.conflicts_found,
            ad_group_removed = self.ad_group.conflicts_removed,
            campaign_found = self.campaign.conflicts_found,
            campaign_removed = self.campaign.conflicts_removed,
            shared_list_found = self.shared_list.conflicts_found,
            shared_list_removed = self.shared_list.conflicts_removed,
            false_positives_avoided = self.false_positives_avoided,
            malformed_negatives_skipped = self.malformed_negatives_skipped,
        );
    }
}
