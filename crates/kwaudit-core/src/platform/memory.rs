//! In-memory platform adapter.
//!
//! Serves an [`AccountSnapshot`] through the [`AdsPlatform`] trait and applies
//! removals to it. Used by the CLI over a JSON export and by tests, which can
//! also inject enumeration and removal failures.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::{
    AccountSnapshot, AdsPlatform, NegativeKeywordRow, PlatformError, PlatformResult,
    PositiveKeywordQuery, PositiveKeywordRow, RowStream,
};
use crate::domain::{
    CampaignId, KeywordText, MatchType, NegativeKeywordRecord, NegativeScope, SharedListRef,
};

#[derive(Debug, Default)]
struct Faults {
    positives_fail_after: Option<usize>,
    removal_failures: HashSet<String>,
}

/// [`AdsPlatform`] backed by an in-memory [`AccountSnapshot`].
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    account: Mutex<AccountSnapshot>,
    removed: Mutex<Vec<NegativeKeywordRecord>>,
    removal_calls: Mutex<usize>,
    faults: Mutex<Faults>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryPlatform {
    pub fn new(account: AccountSnapshot) -> Self {
        Self {
            account: Mutex::new(account),
            ..Self::default()
        }
    }

    /// Make positive enumeration fail after yielding `rows` rows.
    pub fn fail_positives_after(self, rows: usize) -> Self {
        lock(&self.faults).positives_fail_after = Some(rows);
        self
    }

    /// Make removal of negatives with this (normalized) text fail.
    pub fn fail_removal_of(self, text: &str) -> Self {
        let key = KeywordText::normalize(text)
            .map(String::from)
            .unwrap_or_default();
        lock(&self.faults).removal_failures.insert(key);
        self
    }

    /// Current account state, including applied removals.
    pub fn snapshot(&self) -> AccountSnapshot {
        lock(&self.account).clone()
    }

    /// Negatives actually removed, in removal order.
    pub fn removed(&self) -> Vec<NegativeKeywordRecord> {
        lock(&self.removed).clone()
    }

    /// Number of times `remove_negative` was called, including no-ops.
    pub fn removal_calls(&self) -> usize {
        *lock(&self.removal_calls)
    }

    fn negatives(&self, rows: Vec<NegativeKeywordRow>) -> RowStream<'_, NegativeKeywordRow> {
        stream::iter(rows.into_iter().map(Ok)).boxed()
    }
}

fn same_keyword(row: &NegativeKeywordRow, negative: &NegativeKeywordRecord) -> bool {
    KeywordText::normalize(&row.text).as_ref() == Some(&negative.text)
        && MatchType::parse(&row.match_type) == negative.match_type
}

fn take_first<F>(rows: &mut Vec<NegativeKeywordRow>, pred: F) -> bool
where
    F: Fn(&NegativeKeywordRow) -> bool,
{
    match rows.iter().position(pred) {
        Some(idx) => {
            rows.remove(idx);
            true
        }
        None => false,
    }
}

#[async_trait]
impl AdsPlatform for MemoryPlatform {
    fn positive_keywords(
        &self,
        query: &PositiveKeywordQuery,
    ) -> RowStream<'_, PositiveKeywordRow> {
        let rows: Vec<PositiveKeywordRow> = lock(&self.account)
            .positives
            .iter()
            .filter(|row| row.enabled)
            .filter(|row| match (&query.date_range, row.last_active) {
                (Some(range), Some(day)) => range.contains(day),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect();

        let fail_after = lock(&self.faults).positives_fail_after;
        let items: Vec<PlatformResult<PositiveKeywordRow>> = match fail_after {
            Some(n) => rows
                .into_iter()
                .take(n)
                .map(Ok)
                .chain(std::iter::once(Err(PlatformError::Enumeration {
                    what: "positive keywords".to_string(),
                    reason: "injected failure".to_string(),
                })))
                .collect(),
            None => rows.into_iter().map(Ok).collect(),
        };
        stream::iter(items).boxed()
    }

    fn ad_group_negatives(&self) -> RowStream<'_, NegativeKeywordRow> {
        let rows = lock(&self.account).ad_group_negatives.clone();
        self.negatives(rows)
    }

    fn campaign_negatives(&self) -> RowStream<'_, NegativeKeywordRow> {
        let rows = lock(&self.account).campaign_negatives.clone();
        self.negatives(rows)
    }

    fn shared_lists(&self) -> RowStream<'_, SharedListRef> {
        let lists: Vec<SharedListRef> = lock(&self.account)
            .shared_lists
            .iter()
            .map(|l| l.list.clone())
            .collect();
        stream::iter(lists.into_iter().map(Ok)).boxed()
    }

    fn shared_list_negatives(&self, list: &SharedListRef) -> RowStream<'_, NegativeKeywordRow> {
        let rows = lock(&self.account)
            .shared_lists
            .iter()
            .find(|l| l.list.id == list.id)
            .map(|l| l.negatives.clone());
        match rows {
            Some(rows) => self.negatives(rows),
            None => stream::iter(vec![Err(PlatformError::Enumeration {
                what: format!("shared list {}", list.id),
                reason: "list not found".to_string(),
            })])
            .boxed(),
        }
    }

    async fn campaigns_attached_to(
        &self,
        list: &SharedListRef,
    ) -> PlatformResult<HashSet<CampaignId>> {
        lock(&self.account)
            .shared_lists
            .iter()
            .find(|l| l.list.id == list.id)
            .map(|l| l.campaign_ids.iter().cloned().map(CampaignId).collect())
            .ok_or_else(|| PlatformError::Enumeration {
                what: format!("campaigns attached to shared list {}", list.id),
                reason: "list not found".to_string(),
            })
    }

    async fn remove_negative(&self, negative: &NegativeKeywordRecord) -> PlatformResult<()> {
        *lock(&self.removal_calls) += 1;

        if lock(&self.faults)
            .removal_failures
            .contains(negative.text.as_str())
        {
            return Err(PlatformError::Removal {
                keyword: negative.text.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        let mut account = lock(&self.account);
        let removed = match &negative.scope {
            NegativeScope::AdGroup {
                campaign_id,
                ad_group_id,
                ..
            } => take_first(&mut account.ad_group_negatives, |row| {
                row.campaign_id.as_deref() == Some(campaign_id.as_str())
                    && row.ad_group_id.as_deref() == Some(ad_group_id.as_str())
                    && same_keyword(row, negative)
            }),
            NegativeScope::Campaign { campaign_id, .. } => {
                take_first(&mut account.campaign_negatives, |row| {
                    row.campaign_id.as_deref() == Some(campaign_id.as_str())
                        && same_keyword(row, negative)
                })
            }
            NegativeScope::SharedList { list_id, .. } => account
                .shared_lists
                .iter_mut()
                .find(|l| &l.list.id == list_id)
                .map(|l| take_first(&mut l.negatives, |row| same_keyword(row, negative)))
                .unwrap_or(false),
        };
        drop(account);

        if removed {
            lock(&self.removed).push(negative.clone());
        }
        Ok(())
    }
}
