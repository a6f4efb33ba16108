//! JSON account export consumed by [`MemoryPlatform`](super::MemoryPlatform).

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{NegativeKeywordRow, PlatformResult, PositiveKeywordRow};
use crate::domain::SharedListRef;

/// A shared negative list with its attachments and contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedListSnapshot {
    #[serde(flatten)]
    pub list: SharedListRef,
    #[serde(default)]
    pub campaign_ids: Vec<String>,
    #[serde(default)]
    pub negatives: Vec<NegativeKeywordRow>,
}

/// Point-in-time export of an account's keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    #[serde(default)]
    pub positives: Vec<PositiveKeywordRow>,
    #[serde(default)]
    pub ad_group_negatives: Vec<NegativeKeywordRow>,
    #[serde(default)]
    pub campaign_negatives: Vec<NegativeKeywordRow>,
    #[serde(default)]
    pub shared_lists: Vec<SharedListSnapshot>,
}

impl AccountSnapshot {
    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> PlatformResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the snapshot as pretty JSON.
    pub fn save(&self, path: &Path) -> PlatformResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Total negatives across all scopes.
    pub fn negative_count(&self) -> usize {
        self.ad_group_negatives.len()
            + self.campaign_negatives.len()
            + self
                .shared_lists
                .iter()
                .map(|l| l.negatives.len())
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SharedListId;

    #[test]
    fn parses_minimal_export() {
        let snapshot: AccountSnapshot = serde_json::from_str(
            r#"{
                "positives": [
                    {"text": "vacuum pump", "match_type": "PHRASE",
                     "campaign_id": "c1", "ad_group_id": "a1"}
                ],
                "shared_lists": [
                    {"id": "l1", "name": "Global", "campaign_ids": ["c1"],
                     "negatives": [{"text": "free", "match_type": "BROAD"}]}
                ]
            }"#,
        )
        .expect("parse");

        assert_eq!(snapshot.positives.len(), 1);
        assert!(snapshot.ad_group_negatives.is_empty());
        assert_eq!(snapshot.shared_lists[0].list.id, SharedListId::new("l1"));
        assert_eq!(snapshot.negative_count(), 1);
    }

    #[test]
    fn save_then_load_preserves_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("account.json");
        let snapshot = AccountSnapshot {
            campaign_negatives: vec![NegativeKeywordRow {
                text: "used".to_string(),
                match_type: "BROAD".to_string(),
                campaign_id: Some("c1".to_string()),
                campaign_name: Some("Pumps".to_string()),
                ad_group_id: None,
                ad_group_name: None,
            }],
            ..AccountSnapshot::default()
        };

        snapshot.save(&path).expect("save");
        let loaded = AccountSnapshot::load(&path).expect("load");
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AccountSnapshot::load(Path::new("/nonexistent/account.json")).unwrap_err();
        assert!(err.to_string().contains("snapshot io error"));
    }
}
