//! Positive keyword index.
//!
//! Built once per run from the platform's enabled keywords and never mutated
//! afterwards. Three views over the same records:
//! - `by_scope`: campaign -> ad group -> keywords
//! - `all_texts`: deduplicated keyword texts
//! - `details`: every record in ingestion order
//!
//! Each record lands in exactly one scope bucket and once in `details`.

use std::collections::{BTreeSet, HashMap, HashSet};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{AdGroupId, CampaignId, KeywordText, PositiveKeywordRecord};
use crate::platform::{PlatformResult, PositiveKeywordRow, RowStream};

/// Ingestion counters for one index build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Records accepted into the index.
    pub indexed: u64,
    /// Rows skipped for missing identity fields or blank text.
    pub skipped_malformed: u64,
    /// Ingestion stopped at the configured cap with rows still pending.
    pub truncated: bool,
    /// The cap in force for this build.
    pub limit: u64,
}

/// Read-only lookup structure over a run's positive keywords.
#[derive(Debug, Clone, Default)]
pub struct PositiveKeywordIndex {
    by_scope: HashMap<CampaignId, HashMap<AdGroupId, Vec<usize>>>,
    all_texts: BTreeSet<KeywordText>,
    details: Vec<PositiveKeywordRecord>,
    stats: IndexStats,
}

impl PositiveKeywordIndex {
    /// Consume `rows` until exhausted or `max_rows` rows have been pulled.
    ///
    /// Malformed rows count toward the cap and are skipped with a warning.
    /// A platform error ends the build and is returned.
    pub async fn build(
        mut rows: RowStream<'_, PositiveKeywordRow>,
        max_rows: u64,
    ) -> PlatformResult<Self> {
        let mut index = Self {
            stats: IndexStats {
                limit: max_rows,
                ..IndexStats::default()
            },
            ..Self::default()
        };
        let mut pulled: u64 = 0;

        while let Some(row) = rows.next().await {
            if pulled >= max_rows {
                index.stats.truncated = true;
                warn!(
                    limit = max_rows,
                    indexed = index.stats.indexed,
                    "positive keyword cap reached; index is partial"
                );
                break;
            }
            pulled += 1;

            let row = row?;
            match PositiveKeywordRecord::try_from(&row) {
                Ok(record) => index.insert(record),
                Err(err) => {
                    index.stats.skipped_malformed += 1;
                    warn!(text = %row.text, error = %err, "skipping malformed positive keyword");
                }
            }
        }

        Ok(index)
    }

    /// Build from already-validated records, without a cap.
    pub fn from_records(records: impl IntoIterator<Item = PositiveKeywordRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index.insert(record);
        }
        index.stats.limit = index.stats.indexed;
        index
    }

    fn insert(&mut self, record: PositiveKeywordRecord) {
        let slot = self.details.len();
        self.by_scope
            .entry(record.campaign_id.clone())
            .or_default()
            .entry(record.ad_group_id.clone())
            .or_default()
            .push(slot);
        self.all_texts.insert(record.text.clone());
        self.details.push(record);
        self.stats.indexed += 1;
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.details.len()
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// Every record in ingestion order.
    pub fn details(&self) -> &[PositiveKeywordRecord] {
        &self.details
    }

    /// Distinct keyword texts across the account.
    pub fn all_texts(&self) -> &BTreeSet<KeywordText> {
        &self.all_texts
    }

    pub fn contains_text(&self, text: &KeywordText) -> bool {
        self.all_texts.contains(text)
    }

    /// Positives in one ad group.
    pub fn in_ad_group<'a>(
        &'a self,
        campaign_id: &CampaignId,
        ad_group_id: &AdGroupId,
    ) -> impl Iterator<Item = &'a PositiveKeywordRecord> + 'a {
        self.by_scope
            .get(campaign_id)
            .and_then(|groups| groups.get(ad_group_id))
            .into_iter()
            .flatten()
            .map(move |&slot| &self.details[slot])
    }

    /// Positives in any ad group of one campaign, in ingestion order.
    pub fn in_campaign<'a>(
        &'a self,
        campaign_id: &CampaignId,
    ) -> impl Iterator<Item = &'a PositiveKeywordRecord> + 'a {
        let mut slots: Vec<usize> = self
            .by_scope
            .get(campaign_id)
            .into_iter()
            .flat_map(|groups| groups.values().flatten().copied())
            .collect();
        slots.sort_unstable();
        slots.into_iter().map(move |slot| &self.details[slot])
    }

    /// Positives in any of the given campaigns, in ingestion order.
    pub fn in_campaigns<'a>(
        &'a self,
        campaign_ids: &'a HashSet<CampaignId>,
    ) -> impl Iterator<Item = &'a PositiveKeywordRecord> + 'a {
        self.details
            .iter()
            .filter(move |record| campaign_ids.contains(&record.campaign_id))
    }

    /// Number of ad groups holding at least one positive.
    pub fn ad_group_count(&self) -> usize {
        self.by_scope.values().map(HashMap::len).sum()
    }

    pub fn campaign_count(&self) -> usize {
        self.by_scope.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MatchType;
    use crate::platform::PlatformError;
    use futures::stream;

    fn row(text: &str, campaign: Option<&str>, ad_group: Option<&str>) -> PositiveKeywordRow {
        PositiveKeywordRow {
            text: text.to_string(),
            match_type: "BROAD".to_string(),
            campaign_id: campaign.map(str::to_string),
            campaign_name: None,
            ad_group_id: ad_group.map(str::to_string),
            ad_group_name: None,
            enabled: true,
            last_active: None,
        }
    }

    fn rows(items: Vec<PositiveKeywordRow>) -> RowStream<'static, PositiveKeywordRow> {
        stream::iter(items.into_iter().map(Ok)).boxed()
    }

    #[tokio::test]
    async fn builds_all_three_views() {
        let index = PositiveKeywordIndex::build(
            rows(vec![
                row("vacuum pump", Some("c1"), Some("a1")),
                row("Vacuum Pump", Some("c1"), Some("a2")),
                row("liquid ring pump", Some("c2"), Some("a3")),
            ]),
            100,
        )
        .await
        .expect("build");

        assert_eq!(index.len(), 3);
        assert_eq!(index.all_texts().len(), 2);
        assert_eq!(index.campaign_count(), 2);
        assert_eq!(index.ad_group_count(), 3);
        assert_eq!(
            index
                .in_ad_group(&CampaignId::new("c1"), &AdGroupId::new("a2"))
                .count(),
            1
        );
        assert_eq!(index.in_campaign(&CampaignId::new("c1")).count(), 2);
        assert_eq!(index.details()[2].match_type, MatchType::Broad);
        assert!(!index.stats().truncated);
    }

    #[tokio::test]
    async fn every_record_in_exactly_one_bucket() {
        let index = PositiveKeywordIndex::build(
            rows(vec![
                row("a", Some("c1"), Some("a1")),
                row("b", Some("c1"), Some("a1")),
                row("c", Some("c1"), Some("a2")),
                row("d", Some("c2"), Some("a1")),
            ]),
            100,
        )
        .await
        .expect("build");

        let bucketed: usize = index
            .by_scope
            .values()
            .flat_map(|groups| groups.values())
            .map(Vec::len)
            .sum();
        assert_eq!(bucketed, index.details().len());
        assert_eq!(
            index
                .in_ad_group(&CampaignId::new("c2"), &AdGroupId::new("a1"))
                .map(|r| r.text.as_str())
                .collect::<Vec<_>>(),
            ["d"]
        );
    }

    #[tokio::test]
    async fn skips_malformed_rows() {
        let index = PositiveKeywordIndex::build(
            rows(vec![
                row("pump", None, Some("a1")),
                row("pump", Some("c1"), None),
                row("   ", Some("c1"), Some("a1")),
                row("vacuum pump", Some("c1"), Some("a1")),
            ]),
            100,
        )
        .await
        .expect("build");

        assert_eq!(index.len(), 1);
        assert_eq!(index.stats().skipped_malformed, 3);
    }

    #[tokio::test]
    async fn stops_at_cap_and_flags_truncation() {
        let index = PositiveKeywordIndex::build(
            rows(vec![
                row("a", Some("c1"), Some("a1")),
                row("b", Some("c1"), Some("a1")),
                row("c", Some("c1"), Some("a1")),
            ]),
            2,
        )
        .await
        .expect("build");

        assert_eq!(index.len(), 2);
        let stats = index.stats();
        assert!(stats.truncated);
        assert_eq!(stats.limit, 2);
    }

    #[tokio::test]
    async fn exact_fit_is_not_truncated() {
        let index = PositiveKeywordIndex::build(
            rows(vec![
                row("a", Some("c1"), Some("a1")),
                row("b", Some("c1"), Some("a1")),
            ]),
            2,
        )
        .await
        .expect("build");
        assert!(!index.stats().truncated);
    }

    #[tokio::test]
    async fn platform_error_aborts_build() {
        let items: Vec<PlatformResult<PositiveKeywordRow>> = vec![
            Ok(row("a", Some("c1"), Some("a1"))),
            Err(PlatformError::Enumeration {
                what: "positive keywords".to_string(),
                reason: "timeout".to_string(),
            }),
        ];
        let result = PositiveKeywordIndex::build(stream::iter(items).boxed(), 10).await;
        assert!(result.is_err());
    }

    #[test]
    fn campaign_set_filter() {
        let index = PositiveKeywordIndex::from_records(vec![
            PositiveKeywordRecord::try_from(&row("a", Some("c1"), Some("a1"))).expect("a"),
            PositiveKeywordRecord::try_from(&row("b", Some("c2"), Some("a2"))).expect("b"),
        ]);
        let attached: HashSet<CampaignId> = [CampaignId::new("c2")].into_iter().collect();
        let texts: Vec<_> = index
            .in_campaigns(&attached)
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(texts, ["b"]);
        assert!(index.contains_text(&KeywordText::normalize("A").expect("text")));
    }
}
