//! Record catalog and aggregate statistics

use crate::record::VaultRecord;
use foldvault_types::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

/// Aggregate view over cataloged records
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VaultStats {
    /// Records counted
    pub record_count: u64,
    /// Sum of original sizes
    pub total_original_size: u64,
    /// Sum of stored payload sizes
    pub total_final_size: u64,
    /// `total_final_size / total_original_size`, 1.0 when nothing is stored
    pub overall_ratio: f64,
    /// Records per strategy tag; a record counts once per strategy it uses
    pub strategy_usage: BTreeMap<String, u64>,
}

impl VaultStats {
    /// Bytes saved by folding
    pub fn space_saved(&self) -> u64 {
        self.total_original_size
            .saturating_sub(self.total_final_size)
    }
}

/// What the catalog keeps per record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Owning principal
    pub owner_id: String,
    /// Size of the original content
    pub original_size: u64,
    /// Size of the stored payload
    pub final_size: u64,
    /// Distinct strategy tags used, `passthrough` for an empty trace
    pub strategies: Vec<String>,
}

impl From<&VaultRecord> for CatalogEntry {
    fn from(record: &VaultRecord) -> Self {
        let mut strategies: Vec<String> = record
            .pipeline_trace
            .strategy_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        if strategies.is_empty() {
            strategies.push(foldvault_types::StrategyId::Passthrough.as_str().to_string());
        }
        strategies.sort();
        strategies.dedup();

        Self {
            owner_id: record.owner_id.clone(),
            original_size: record.original_size,
            final_size: record.final_size,
            strategies,
        }
    }
}

/// Records this engine instance has stored or loaded
#[derive(Debug, Default)]
pub struct Catalog {
    entries: RwLock<HashMap<RecordId, CatalogEntry>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or refresh a record
    pub fn insert(&self, record: &VaultRecord) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.record_id, CatalogEntry::from(record));
    }

    /// Forget a record
    pub fn remove(&self, record_id: &RecordId) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(record_id)
            .is_some()
    }

    /// Number of cataloged records
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate over all records, or those of `owner_id`
    pub fn stats(&self, owner_id: Option<&str>) -> VaultStats {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        let mut stats = VaultStats::default();
        for entry in entries
            .values()
            .filter(|entry| owner_id.map_or(true, |owner| entry.owner_id == owner))
        {
            stats.record_count += 1;
            stats.total_original_size += entry.original_size;
            stats.total_final_size += entry.final_size;
            for strategy in &entry.strategies {
                *stats.strategy_usage.entry(strategy.clone()).or_insert(0) += 1;
            }
        }

        stats.overall_ratio = if stats.total_original_size == 0 {
            1.0
        } else {
            stats.total_final_size as f64 / stats.total_original_size as f64
        };
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FORMAT_VERSION;
    use chrono::Utc;
    use foldvault_compression::{FoldingStage, PipelineTrace};
    use foldvault_types::ContentClass;

    fn record(owner: &str, original: u64, final_size: u64, strategies: &[&str]) -> VaultRecord {
        VaultRecord {
            format_version: FORMAT_VERSION,
            record_id: RecordId::new(),
            owner_id: owner.to_string(),
            collection_id: "c".to_string(),
            name: "n".to_string(),
            original_size: original,
            final_size,
            integrity_hash: String::new(),
            pipeline_trace: PipelineTrace {
                stages: strategies
                    .iter()
                    .map(|s| FoldingStage {
                        strategy_id: (*s).to_string(),
                        input_size: 0,
                        output_size: 0,
                        strategy_metadata: Default::default(),
                    })
                    .collect(),
            },
            payload: Vec::new(),
            content_index: None,
            content_class: ContentClass::Unknown,
            created_at: Utc::now(),
            access_count: 0,
            last_accessed_at: None,
        }
    }

    #[test]
    fn test_empty_stats() {
        let stats = Catalog::new().stats(None);
        assert_eq!(stats.record_count, 0);
        assert_eq!(stats.overall_ratio, 1.0);
    }

    #[test]
    fn test_stats_by_owner() {
        let catalog = Catalog::new();
        catalog.insert(&record("alice", 1000, 100, &["rle", "entropy"]));
        catalog.insert(&record("alice", 200, 200, &[]));
        let bob = record("bob", 800, 400, &["deflate", "deflate"]);
        catalog.insert(&bob);

        let all = catalog.stats(None);
        assert_eq!(all.record_count, 3);
        assert_eq!(all.total_original_size, 2000);
        assert_eq!(all.total_final_size, 700);
        assert_eq!(all.overall_ratio, 0.35);
        assert_eq!(all.space_saved(), 1300);
        assert_eq!(all.strategy_usage["passthrough"], 1);
        assert_eq!(all.strategy_usage["deflate"], 1);

        let alice = catalog.stats(Some("alice"));
        assert_eq!(alice.record_count, 2);
        assert!(!alice.strategy_usage.contains_key("deflate"));

        assert!(catalog.remove(&bob.record_id));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.stats(Some("bob")).record_count, 0);
    }
}
