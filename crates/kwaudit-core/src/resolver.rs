//! Scope resolvers.
//!
//! Each resolver walks one level of negatives (ad group, campaign, shared
//! list), checks every negative against the positives it can reach, and
//! removes the ones that block something. Reach per level:
//!
//! - ad group: positives in the same campaign and ad group
//! - campaign: positives in any ad group of the same campaign
//! - shared list: positives in campaigns attached to the list; a list with
//!   no attached campaigns is skipped without enumerating its negatives
//!
//! The first blocking positive wins. The legacy substring rule is evaluated
//! on the same candidates so avoided false positives can be counted.

use std::collections::HashSet;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::conflict::NegativeMatcher;
use crate::domain::{
    AuditConfig, CampaignId, MalformedRecord, NegativeKeywordRecord, NegativeScope,
    PositiveKeywordRecord, Result, ScopeLevel,
};
use crate::index::PositiveKeywordIndex;
use crate::metrics::AuditMetrics;
use crate::obs;
use crate::platform::{AdsPlatform, NegativeKeywordRow};

/// What was done about a conflicting negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// Removed from the platform.
    Removed,
    /// Dry run: reported only.
    Flagged,
}

impl DecisionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Removed => "removed",
            Self::Flagged => "flagged",
        }
    }
}

/// One negative found to block a positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictDecision {
    pub level: ScopeLevel,
    pub negative: NegativeKeywordRecord,
    /// First positive found to be blocked.
    pub blocked: PositiveKeywordRecord,
    pub action: DecisionAction,
}

/// Counters plus the decision trail for one run.
#[derive(Debug, Clone, Default)]
pub struct RunTally {
    pub metrics: AuditMetrics,
    pub decisions: Vec<ConflictDecision>,
}

/// Applies the conflict predicate to negatives at each scope level.
pub struct ScopeResolver<'a, P: AdsPlatform + ?Sized> {
    platform: &'a P,
    index: &'a PositiveKeywordIndex,
    dry_run: bool,
    detailed_logging: bool,
}

impl<'a, P: AdsPlatform + ?Sized> ScopeResolver<'a, P> {
    pub fn new(platform: &'a P, index: &'a PositiveKeywordIndex, config: &AuditConfig) -> Self {
        Self {
            platform,
            index,
            dry_run: config.dry_run,
            detailed_logging: config.detailed_logging,
        }
    }

    /// Check ad-group negatives against their own ad group's positives.
    pub async fn resolve_ad_groups(&self, tally: &mut RunTally) -> Result<()> {
        let mut rows = self.platform.ad_group_negatives();
        while let Some(row) = rows.next().await {
            let negative = match accept(row?.into_ad_group_record(), tally) {
                Some(negative) => negative,
                None => continue,
            };
            let candidates = self.candidates(&negative, None);
            self.resolve_one(negative, &candidates, tally).await?;
        }
        Ok(())
    }

    /// Check campaign negatives against every positive in the campaign.
    pub async fn resolve_campaigns(&self, tally: &mut RunTally) -> Result<()> {
        let mut rows = self.platform.campaign_negatives();
        while let Some(row) = rows.next().await {
            let negative = match accept(row?.into_campaign_record(), tally) {
                Some(negative) => negative,
                None => continue,
            };
            let candidates = self.candidates(&negative, None);
            self.resolve_one(negative, &candidates, tally).await?;
        }
        Ok(())
    }

    /// Check shared-list negatives against positives in attached campaigns.
    pub async fn resolve_shared_lists(&self, tally: &mut RunTally) -> Result<()> {
        let mut lists = self.platform.shared_lists();
        while let Some(list) = lists.next().await {
            let list = list?;
            let attached = self.platform.campaigns_attached_to(&list).await?;
            if attached.is_empty() {
                tally.metrics.inc_shared_lists_skipped();
                info!(list = %list.name, "shared list has no attached campaigns; skipping");
                continue;
            }

            let mut rows = self.platform.shared_list_negatives(&list);
            while let Some(row) = rows.next().await {
                let row: NegativeKeywordRow = row?;
                let negative = match accept(row.into_shared_list_record(&list), tally) {
                    Some(negative) => negative,
                    None => continue,
                };
                let candidates = self.candidates(&negative, Some(&attached));
                self.resolve_one(negative, &candidates, tally).await?;
            }
        }
        Ok(())
    }

    fn candidates<'s>(
        &'s self,
        negative: &NegativeKeywordRecord,
        attached: Option<&'s HashSet<CampaignId>>,
    ) -> Vec<&'s PositiveKeywordRecord> {
        match (&negative.scope, attached) {
            (
                NegativeScope::AdGroup {
                    campaign_id,
                    ad_group_id,
                    ..
                },
                _,
            ) => self.index.in_ad_group(campaign_id, ad_group_id).collect(),
            (NegativeScope::Campaign { campaign_id, .. }, _) => {
                self.index.in_campaign(campaign_id).collect()
            }
            (NegativeScope::SharedList { .. }, Some(attached)) => {
                self.index.in_campaigns(attached).collect()
            }
            (NegativeScope::SharedList { .. }, None) => Vec::new(),
        }
    }

    async fn resolve_one(
        &self,
        negative: NegativeKeywordRecord,
        candidates: &[&PositiveKeywordRecord],
        tally: &mut RunTally,
    ) -> Result<()> {
        let level = negative.scope.level();
        let matcher = NegativeMatcher::new(&negative.text, &negative.match_type);
        tally.metrics.inc_checked(level);

        let blocked = candidates
            .iter()
            .copied()
            .find(|positive| matcher.conflicts_with(&positive.text));
        let legacy_flagged = candidates
            .iter()
            .any(|positive| matcher.legacy_conflicts_with(&positive.text));

        if legacy_flagged && blocked.is_none() {
            tally.metrics.inc_false_positives_avoided();
            if self.detailed_logging {
                obs::emit_false_positive_avoided(
                    level,
                    negative.text.as_str(),
                    &negative.match_type,
                );
            }
        }

        let Some(positive) = blocked else {
            if self.detailed_logging {
                obs::emit_no_conflict(level, &negative, candidates.len());
            }
            return Ok(());
        };

        tally.metrics.inc_found(level);
        let action = if self.dry_run {
            DecisionAction::Flagged
        } else {
            self.platform.remove_negative(&negative).await?;
            tally.metrics.inc_removed(level);
            DecisionAction::Removed
        };

        obs::emit_conflict(level, &negative, positive, action.as_str());
        tally.decisions.push(ConflictDecision {
            level,
            negative,
            blocked: positive.clone(),
            action,
        });
        Ok(())
    }
}

fn accept(
    record: std::result::Result<NegativeKeywordRecord, MalformedRecord>,
    tally: &mut RunTally,
) -> Option<NegativeKeywordRecord> {
    match record {
        Ok(negative) => Some(negative),
        Err(err) => {
            tally.metrics.inc_malformed_negatives();
            warn!(error = %err, "skipping malformed negative keyword");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ScopeLevel, SharedListId, SharedListRef};
    use crate::platform::{
        AccountSnapshot, MemoryPlatform, PositiveKeywordRow, SharedListSnapshot,
    };

    fn positive(text: &str, campaign: &str, ad_group: &str) -> PositiveKeywordRow {
        PositiveKeywordRow {
            text: text.to_string(),
            match_type: "BROAD".to_string(),
            campaign_id: Some(campaign.to_string()),
            campaign_name: Some(format!("Campaign {}", campaign)),
            ad_group_id: Some(ad_group.to_string()),
            ad_group_name: Some(format!("Group {}", ad_group)),
            enabled: true,
            last_active: None,
        }
    }

    fn negative(
        text: &str,
        mt: &str,
        campaign: Option<&str>,
        ad_group: Option<&str>,
    ) -> NegativeKeywordRow {
        NegativeKeywordRow {
            text: text.to_string(),
            match_type: mt.to_string(),
            campaign_id: campaign.map(str::to_string),
            campaign_name: None,
            ad_group_id: ad_group.map(str::to_string),
            ad_group_name: None,
        }
    }

    fn index_of(account: &AccountSnapshot) -> PositiveKeywordIndex {
        PositiveKeywordIndex::from_records(
            account
                .positives
                .iter()
                .map(|row| PositiveKeywordRecord::try_from(row).expect("positive")),
        )
    }

    fn live() -> AuditConfig {
        AuditConfig {
            dry_run: false,
            ..AuditConfig::default()
        }
    }

    #[tokio::test]
    async fn ad_group_scope_ignores_other_ad_groups() {
        let account = AccountSnapshot {
            positives: vec![
                positive("medical liquid ring pump", "c1", "a1"),
                positive("dental vacuum", "c1", "a2"),
            ],
            ad_group_negatives: vec![
                negative("dental", "BROAD", Some("c1"), Some("a1")),
                negative("medical", "BROAD", Some("c1"), Some("a1")),
            ],
            ..AccountSnapshot::default()
        };
        let index = index_of(&account);
        let platform = MemoryPlatform::new(account);
        let resolver = ScopeResolver::new(&platform, &index, &live());
        let mut tally = RunTally::default();

        resolver.resolve_ad_groups(&mut tally).await.expect("resolve");

        assert_eq!(tally.metrics.ad_group_conflicts_found(), 1);
        assert_eq!(tally.metrics.ad_group_conflicts_removed(), 1);
        assert_eq!(tally.decisions[0].negative.text.as_str(), "medical");
        assert_eq!(platform.snapshot().ad_group_negatives.len(), 1);
    }

    #[tokio::test]
    async fn campaign_scope_spans_ad_groups() {
        let account = AccountSnapshot {
            positives: vec![
                positive("vacuum pump", "c1", "a1"),
                positive("used compressor", "c1", "a2"),
                positive("used vacuum", "c2", "a3"),
            ],
            campaign_negatives: vec![negative("used", "BROAD", Some("c1"), None)],
            ..AccountSnapshot::default()
        };
        let index = index_of(&account);
        let platform = MemoryPlatform::new(account);
        let resolver = ScopeResolver::new(&platform, &index, &AuditConfig::default());
        let mut tally = RunTally::default();

        resolver.resolve_campaigns(&mut tally).await.expect("resolve");

        assert_eq!(tally.metrics.campaign_conflicts_found(), 1);
        assert_eq!(tally.metrics.campaign_conflicts_removed(), 0);
        let decision = &tally.decisions[0];
        assert_eq!(decision.action, DecisionAction::Flagged);
        assert_eq!(decision.blocked.text.as_str(), "used compressor");
        assert_eq!(platform.removal_calls(), 0);
    }

    #[tokio::test]
    async fn shared_list_scope_filters_by_attachment() {
        let list = SharedListRef {
            id: SharedListId::new("l1"),
            name: "Global".to_string(),
        };
        let account = AccountSnapshot {
            positives: vec![
                positive("free vacuum pump", "c2", "a2"),
                positive("vacuum pump", "c1", "a1"),
            ],
            shared_lists: vec![SharedListSnapshot {
                list,
                campaign_ids: vec!["c1".to_string()],
                negatives: vec![negative("free", "BROAD", None, None)],
            }],
            ..AccountSnapshot::default()
        };
        let index = index_of(&account);
        let platform = MemoryPlatform::new(account);
        let resolver = ScopeResolver::new(&platform, &index, &live());
        let mut tally = RunTally::default();

        resolver.resolve_shared_lists(&mut tally).await.expect("resolve");

        assert_eq!(tally.metrics.shared_list_conflicts_found(), 0);
        assert_eq!(tally.metrics.scope(ScopeLevel::SharedList).checked, 1);
        assert!(platform.removed().is_empty());
    }

    #[tokio::test]
    async fn unattached_shared_list_is_skipped() {
        let account = AccountSnapshot {
            positives: vec![positive("free vacuum pump", "c1", "a1")],
            shared_lists: vec![SharedListSnapshot {
                list: SharedListRef {
                    id: SharedListId::new("l1"),
                    name: "Orphan".to_string(),
                },
                campaign_ids: vec![],
                negatives: vec![negative("free", "BROAD", None, None)],
            }],
            ..AccountSnapshot::default()
        };
        let index = index_of(&account);
        let platform = MemoryPlatform::new(account);
        let resolver = ScopeResolver::new(&platform, &index, &live());
        let mut tally = RunTally::default();

        resolver.resolve_shared_lists(&mut tally).await.expect("resolve");

        assert_eq!(tally.metrics.shared_lists_skipped(), 1);
        assert_eq!(tally.metrics.scope(ScopeLevel::SharedList).checked, 0);
    }

    #[tokio::test]
    async fn false_positive_counted_once_per_negative() {
        let account = AccountSnapshot {
            positives: vec![
                positive("mining vacuum pump", "c1", "a1"),
                positive("mini mining rig", "c1", "a1"),
                positive("minimal pump", "c1", "a1"),
            ],
            campaign_negatives: vec![
                negative("minim", "PHRASE", Some("c1"), None),
                negative("mini", "PHRASE", Some("c1"), None),
            ],
            ..AccountSnapshot::default()
        };
        let index = index_of(&account);
        let platform = MemoryPlatform::new(account);
        let resolver = ScopeResolver::new(&platform, &index, &AuditConfig::default());
        let mut tally = RunTally::default();

        resolver.resolve_campaigns(&mut tally).await.expect("resolve");

        // "minim" hits only as a substring; "mini" is a real word in one positive.
        assert_eq!(tally.metrics.false_positives_avoided(), 1);
        assert_eq!(tally.metrics.campaign_conflicts_found(), 1);
    }

    #[tokio::test]
    async fn substring_hits_on_many_positives_count_as_one_avoided() {
        let account = AccountSnapshot {
            positives: vec![
                positive("mining pump", "c1", "a1"),
                positive("minimal pump", "c1", "a1"),
                positive("minivan", "c1", "a2"),
            ],
            campaign_negatives: vec![negative("min", "PHRASE", Some("c1"), None)],
            ..AccountSnapshot::default()
        };
        let index = index_of(&account);
        let platform = MemoryPlatform::new(account);
        let resolver = ScopeResolver::new(&platform, &index, &AuditConfig::default());
        let mut tally = RunTally::default();

        resolver.resolve_campaigns(&mut tally).await.expect("resolve");

        assert_eq!(tally.metrics.false_positives_avoided(), 1);
        assert_eq!(tally.metrics.campaign_conflicts_found(), 0);
        assert!(tally.decisions.is_empty());
    }

    #[tokio::test]
    async fn malformed_negative_is_skipped_and_counted() {
        let account = AccountSnapshot {
            positives: vec![positive("vacuum pump", "c1", "a1")],
            ad_group_negatives: vec![
                negative("pump", "BROAD", Some("c1"), None),
                negative("vacuum", "BROAD", Some("c1"), Some("a1")),
            ],
            ..AccountSnapshot::default()
        };
        let index = index_of(&account);
        let platform = MemoryPlatform::new(account);
        let resolver = ScopeResolver::new(&platform, &index, &AuditConfig::default());
        let mut tally = RunTally::default();

        resolver.resolve_ad_groups(&mut tally).await.expect("resolve");

        assert_eq!(tally.metrics.malformed_negatives_skipped(), 1);
        assert_eq!(tally.metrics.ad_group_conflicts_found(), 1);
    }

    #[tokio::test]
    async fn removal_failure_propagates_after_counting_found() {
        let account = AccountSnapshot {
            positives: vec![positive("vacuum pump", "c1", "a1")],
            campaign_negatives: vec![negative("vacuum", "BROAD", Some("c1"), None)],
            ..AccountSnapshot::default()
        };
        let index = index_of(&account);
        let platform = MemoryPlatform::new(account).fail_removal_of("vacuum");
        let resolver = ScopeResolver::new(&platform, &index, &live());
        let mut tally = RunTally::default();

        let err = resolver.resolve_campaigns(&mut tally).await.unwrap_err();

        assert!(err.to_string().contains("platform operation failed"));
        assert_eq!(tally.metrics.campaign_conflicts_found(), 1);
        assert_eq!(tally.metrics.campaign_conflicts_removed(), 0);
        assert!(tally.decisions.is_empty());
    }
}
