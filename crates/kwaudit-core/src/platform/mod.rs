//! Advertising platform adapter seam.
//!
//! The audit core never talks to the platform directly. It consumes:
//! - pull-based streams of raw keyword rows (finite, not restartable)
//! - shared list membership lookups
//! - a single removal call per flagged negative
//!
//! `MemoryPlatform` implements the trait over an [`AccountSnapshot`], which
//! can be loaded from and saved to a JSON account export.

pub mod memory;
pub mod snapshot;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::{
    AdGroupId, CampaignId, DateRange, KeywordText, MalformedRecord, MatchType,
    NegativeKeywordRecord, NegativeScope, PositiveKeywordRecord, SharedListRef,
};

pub use memory::MemoryPlatform;
pub use snapshot::{AccountSnapshot, SharedListSnapshot};

/// Result type for platform operations.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Lazy, finite sequence of platform rows.
pub type RowStream<'a, T> = BoxStream<'a, PlatformResult<T>>;

/// Failures reported by a platform adapter. Not retried by the core.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("failed to enumerate {what}: {reason}")]
    Enumeration { what: String, reason: String },

    #[error("failed to remove negative keyword '{keyword}': {reason}")]
    Removal { keyword: String, reason: String },

    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Filter applied upstream to positive keyword enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositiveKeywordQuery {
    pub date_range: Option<DateRange>,
}

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

/// Positive keyword row as exported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositiveKeywordRow {
    pub text: String,
    pub match_type: String,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub ad_group_id: Option<String>,
    #[serde(default)]
    pub ad_group_name: Option<String>,
    /// Keyword, ad group and campaign are all enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Last day the keyword served; used for date-scoped enumeration.
    #[serde(default)]
    pub last_active: Option<NaiveDate>,
}

/// Negative keyword row as exported by the platform.
///
/// Ad group rows carry campaign and ad group identity, campaign rows carry
/// campaign identity, shared list rows carry neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeKeywordRow {
    pub text: String,
    pub match_type: String,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub ad_group_id: Option<String>,
    #[serde(default)]
    pub ad_group_name: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn required(
    value: &Option<String>,
    kind: &'static str,
    field: &'static str,
) -> Result<String, MalformedRecord> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(MalformedRecord::MissingField { kind, field }),
    }
}

impl TryFrom<&PositiveKeywordRow> for PositiveKeywordRecord {
    type Error = MalformedRecord;

    fn try_from(row: &PositiveKeywordRow) -> Result<Self, Self::Error> {
        let campaign_id = required(&row.campaign_id, "positive", "campaign_id")?;
        let ad_group_id = required(&row.ad_group_id, "positive", "ad_group_id")?;
        let text = KeywordText::normalize(&row.text).ok_or(MalformedRecord::EmptyText)?;
        Ok(Self {
            text,
            match_type: MatchType::parse(&row.match_type),
            campaign_name: row.campaign_name.clone().unwrap_or_else(|| campaign_id.clone()),
            ad_group_name: row.ad_group_name.clone().unwrap_or_else(|| ad_group_id.clone()),
            campaign_id: CampaignId(campaign_id),
            ad_group_id: AdGroupId(ad_group_id),
        })
    }
}

impl NegativeKeywordRow {
    /// Validate an ad-group-level negative.
    pub fn into_ad_group_record(self) -> Result<NegativeKeywordRecord, MalformedRecord> {
        let campaign_id = required(&self.campaign_id, "ad group negative", "campaign_id")?;
        let ad_group_id = required(&self.ad_group_id, "ad group negative", "ad_group_id")?;
        let scope = NegativeScope::AdGroup {
            campaign_name: self.campaign_name.clone().unwrap_or_else(|| campaign_id.clone()),
            ad_group_name: self.ad_group_name.clone().unwrap_or_else(|| ad_group_id.clone()),
            campaign_id: CampaignId(campaign_id),
            ad_group_id: AdGroupId(ad_group_id),
        };
        self.into_record(scope)
    }

    /// Validate a campaign-level negative.
    pub fn into_campaign_record(self) -> Result<NegativeKeywordRecord, MalformedRecord> {
        let campaign_id = required(&self.campaign_id, "campaign negative", "campaign_id")?;
        let scope = NegativeScope::Campaign {
            campaign_name: self.campaign_name.clone().unwrap_or_else(|| campaign_id.clone()),
            campaign_id: CampaignId(campaign_id),
        };
        self.into_record(scope)
    }

    /// Attach a shared-list negative to its list.
    pub fn into_shared_list_record(
        self,
        list: &SharedListRef,
    ) -> Result<NegativeKeywordRecord, MalformedRecord> {
        let scope = NegativeScope::SharedList {
            list_id: list.id.clone(),
            list_name: list.name.clone(),
        };
        self.into_record(scope)
    }

    fn into_record(self, scope: NegativeScope) -> Result<NegativeKeywordRecord, MalformedRecord> {
        let text = KeywordText::normalize(&self.text).ok_or(MalformedRecord::EmptyText)?;
        Ok(NegativeKeywordRecord {
            text,
            match_type: MatchType::parse(&self.match_type),
            scope,
        })
    }
}

// ---------------------------------------------------------------------------
// Adapter trait
// ---------------------------------------------------------------------------

/// Advertising platform operations the audit depends on.
///
/// Enumeration methods return lazy streams; errors surface per item and
/// abort the run when they reach the core.
#[async_trait]
pub trait AdsPlatform: Send + Sync {
    /// Enabled positive keywords, optionally scoped to a date range.
    fn positive_keywords(
        &self,
        query: &PositiveKeywordQuery,
    ) -> RowStream<'_, PositiveKeywordRow>;

    /// Negatives defined on ad groups.
    fn ad_group_negatives(&self) -> RowStream<'_, NegativeKeywordRow>;

    /// Negatives defined on campaigns.
    fn campaign_negatives(&self) -> RowStream<'_, NegativeKeywordRow>;

    /// Shared negative keyword lists in the account.
    fn shared_lists(&self) -> RowStream<'_, SharedListRef>;

    /// Negatives contained in one shared list.
    fn shared_list_negatives(&self, list: &SharedListRef) -> RowStream<'_, NegativeKeywordRow>;

    /// Campaigns currently attached to a shared list.
    async fn campaigns_attached_to(
        &self,
        list: &SharedListRef,
    ) -> PlatformResult<HashSet<CampaignId>>;

    /// Remove a negative keyword. Succeeds if it is already gone.
    async fn remove_negative(&self, negative: &NegativeKeywordRecord) -> PlatformResult<()>;
}
