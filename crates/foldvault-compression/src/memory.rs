//! Pattern memory
//!
//! Learns which strategies worked for content with a given signature and
//! recommends a trial order for similar content later. The memory only ever
//! reorders candidates; an empty or stale memory cannot break selection.

use crate::analyzer::ContentSignature;
use foldvault_types::{MemoryConfig, StrategyId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[cfg(feature = "serde")]
use foldvault_types::{Error, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use std::path::Path;

/// Running statistics of one strategy under one signature
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StrategyStats {
    /// Weighted running average of `output / input`
    pub average_ratio: f64,
    /// Number of observations folded into the average
    pub observations: u64,
}

impl StrategyStats {
    fn observe(&mut self, ratio: f64, weight_window: u64) {
        self.observations += 1;
        let weight = self.observations.min(weight_window) as f64;
        self.average_ratio += (ratio - self.average_ratio) / weight;
    }
}

/// What the memory knows about one signature
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PatternEntry {
    /// Strategy with the lowest average ratio so far
    pub best_strategy_id: StrategyId,
    /// Weighted running average over every observation of the signature
    pub running_average_ratio: f64,
    /// Number of observations
    pub usage_count: u64,
    /// Logical clock of the last observe or recommend
    pub last_used: u64,
    /// Per-strategy statistics
    pub strategies: BTreeMap<StrategyId, StrategyStats>,
}

impl PatternEntry {
    fn new(strategy: StrategyId, clock: u64) -> Self {
        Self {
            best_strategy_id: strategy,
            running_average_ratio: 0.0,
            usage_count: 0,
            last_used: clock,
            strategies: BTreeMap::new(),
        }
    }

    /// Strategies ordered from best to worst average ratio
    ///
    /// Ties prefer the strategy with more observations, then registry order.
    pub fn ranked(&self) -> Vec<StrategyId> {
        let mut ranked: Vec<(&StrategyId, &StrategyStats)> = self.strategies.iter().collect();
        ranked.sort_by(|(a_id, a), (b_id, b)| {
            a.average_ratio
                .total_cmp(&b.average_ratio)
                .then(b.observations.cmp(&a.observations))
                .then(a_id.cmp(b_id))
        });
        ranked.into_iter().map(|(id, _)| *id).collect()
    }
}

/// Serializable copy of the memory contents
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemorySnapshot {
    /// Logical clock at snapshot time
    pub clock: u64,
    /// Entries keyed by signature
    pub entries: Vec<(ContentSignature, PatternEntry)>,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<ContentSignature, PatternEntry>,
    clock: u64,
}

impl MemoryState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_lru(&mut self) {
        let lru_key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| *key);

        if let Some(key) = lru_key {
            self.entries.remove(&key);
            debug!("Evicted pattern {} from memory", key);
        }
    }
}

/// Bounded signature → strategy memory, safe to share across tasks
#[derive(Debug)]
pub struct PatternMemory {
    state: Mutex<MemoryState>,
    capacity: usize,
    weight_window: u64,
}

impl PatternMemory {
    /// Create an empty memory
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            capacity: config.capacity.max(1),
            weight_window: config.weight_window.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // Poisoning leaves a consistent map behind.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that `strategy` achieved `ratio` on content with `signature`
    pub fn observe(&self, signature: ContentSignature, strategy: StrategyId, ratio: f64) {
        if !ratio.is_finite() {
            return;
        }

        let weight_window = self.weight_window;
        let mut state = self.lock();
        let clock = state.tick();

        if !state.entries.contains_key(&signature) && state.entries.len() >= self.capacity {
            state.evict_lru();
        }

        let entry = state
            .entries
            .entry(signature)
            .or_insert_with(|| PatternEntry::new(strategy, clock));
        entry.usage_count += 1;
        entry.last_used = clock;
        let weight = entry.usage_count.min(weight_window) as f64;
        entry.running_average_ratio += (ratio - entry.running_average_ratio) / weight;
        entry
            .strategies
            .entry(strategy)
            .or_default()
            .observe(ratio, weight_window);
        if let Some(best) = entry.ranked().first() {
            entry.best_strategy_id = *best;
        }

        debug!(
            "Observed {} on pattern {}: ratio={:.3}, usage={}",
            strategy, signature, ratio, entry.usage_count
        );
    }

    /// Strategies ranked for `signature`, best first; empty when unknown
    pub fn recommend(&self, signature: ContentSignature) -> Vec<StrategyId> {
        let mut state = self.lock();
        let clock = state.tick();
        match state.entries.get_mut(&signature) {
            Some(entry) => {
                entry.last_used = clock;
                entry.ranked()
            }
            None => Vec::new(),
        }
    }

    /// Copy of the entry for `signature` without touching recency
    pub fn entry(&self, signature: ContentSignature) -> Option<PatternEntry> {
        self.lock().entries.get(&signature).cloned()
    }

    /// Number of signatures remembered
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether nothing has been learned yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything
    pub fn reset(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.clock = 0;
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> MemorySnapshot {
        let state = self.lock();
        let mut entries: Vec<_> = state
            .entries
            .iter()
            .map(|(signature, entry)| (*signature, entry.clone()))
            .collect();
        entries.sort_by_key(|(signature, _)| *signature);
        MemorySnapshot {
            clock: state.clock,
            entries,
        }
    }

    /// Replace the contents with `snapshot`, keeping the most recent entries
    /// when it exceeds capacity
    pub fn restore(&self, snapshot: MemorySnapshot) {
        let mut entries = snapshot.entries;
        entries.sort_by(|a, b| b.1.last_used.cmp(&a.1.last_used));
        entries.truncate(self.capacity);

        let mut state = self.lock();
        state.clock = snapshot.clock;
        state.entries = entries.into_iter().collect();
    }
}

#[cfg(feature = "serde")]
impl PatternMemory {
    /// Write a snapshot to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        let data = bincode::serde::encode_to_vec(&snapshot, bincode::config::standard())
            .map_err(|e| {
                Error::serialization(format!("Failed to serialize pattern memory: {}", e))
            })?;

        std::fs::write(path, data).map_err(|e| {
            Error::io(format!("Failed to write pattern memory '{}': {}", path.display(), e))
        })?;

        debug!(
            "Saved {} patterns to {}",
            snapshot.entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Create a memory from a snapshot written by [`PatternMemory::save`]
    pub fn load(path: &Path, config: &MemoryConfig) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            Error::io(format!("Failed to read pattern memory '{}': {}", path.display(), e))
        })?;

        let (snapshot, _): (MemorySnapshot, usize) =
            bincode::serde::decode_from_slice(&data, bincode::config::standard()).map_err(
                |e| Error::serialization(format!("Failed to deserialize pattern memory: {}", e)),
            )?;

        let memory = Self::new(config);
        memory.restore(snapshot);
        Ok(memory)
    }
}

impl Default for PatternMemory {
    fn default() -> Self {
        Self::new(&MemoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sig(value: u64) -> ContentSignature {
        ContentSignature::from_raw(value)
    }

    #[test]
    fn test_empty_memory_recommends_nothing() {
        let memory = PatternMemory::default();
        assert!(memory.recommend(sig(1)).is_empty());
        assert!(memory.is_empty());
    }

    #[test]
    fn test_ranking_follows_average_ratio() {
        let memory = PatternMemory::default();
        memory.observe(sig(1), StrategyId::Deflate, 0.4);
        memory.observe(sig(1), StrategyId::Dictionary, 0.2);
        memory.observe(sig(1), StrategyId::Entropy, 0.6);

        assert_eq!(
            memory.recommend(sig(1)),
            vec![StrategyId::Dictionary, StrategyId::Deflate, StrategyId::Entropy]
        );

        let entry = memory.entry(sig(1)).unwrap();
        assert_eq!(entry.best_strategy_id, StrategyId::Dictionary);
        assert_eq!(entry.usage_count, 3);
        assert!((entry.running_average_ratio - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_average_window() {
        let config = MemoryConfig {
            weight_window: 2,
            ..MemoryConfig::default()
        };
        let memory = PatternMemory::new(&config);
        memory.observe(sig(7), StrategyId::Deflate, 1.0);
        memory.observe(sig(7), StrategyId::Deflate, 0.0);
        memory.observe(sig(7), StrategyId::Deflate, 0.0);

        // 1.0 -> 0.5 -> 0.25 once the window saturates
        let stats = memory.entry(sig(7)).unwrap().strategies[&StrategyId::Deflate];
        assert!((stats.average_ratio - 0.25).abs() < 1e-9);
        assert_eq!(stats.observations, 3);
    }

    #[test]
    fn test_lru_eviction() {
        let config = MemoryConfig {
            capacity: 2,
            ..MemoryConfig::default()
        };
        let memory = PatternMemory::new(&config);
        memory.observe(sig(1), StrategyId::Deflate, 0.5);
        memory.observe(sig(2), StrategyId::Deflate, 0.5);
        // touching 1 makes 2 the eviction candidate
        memory.recommend(sig(1));
        memory.observe(sig(3), StrategyId::Deflate, 0.5);

        assert_eq!(memory.len(), 2);
        assert!(memory.entry(sig(1)).is_some());
        assert!(memory.entry(sig(2)).is_none());
        assert!(memory.entry(sig(3)).is_some());
    }

    #[test]
    fn test_non_finite_ratio_ignored() {
        let memory = PatternMemory::default();
        memory.observe(sig(1), StrategyId::Deflate, f64::NAN);
        assert!(memory.is_empty());
    }

    #[test]
    fn test_concurrent_observe_counts_every_call() {
        let memory = Arc::new(PatternMemory::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let memory = Arc::clone(&memory);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        memory.observe(sig(42), StrategyId::RunLength, 0.01);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(memory.entry(sig(42)).unwrap().usage_count, 800);
    }

    #[test]
    fn test_reset() {
        let memory = PatternMemory::default();
        memory.observe(sig(1), StrategyId::Deflate, 0.5);
        memory.reset();
        assert!(memory.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.bin");

        let memory = PatternMemory::default();
        memory.observe(sig(1), StrategyId::Dictionary, 0.3);
        memory.observe(sig(2), StrategyId::RunLength, 0.01);
        memory.save(&path).unwrap();

        let loaded = PatternMemory::load(&path, &MemoryConfig::default()).unwrap();
        assert_eq!(loaded.snapshot(), memory.snapshot());
        assert_eq!(loaded.recommend(sig(2)), vec![StrategyId::RunLength]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.bin");
        std::fs::write(&path, b"").unwrap();
        assert!(PatternMemory::load(&path, &MemoryConfig::default()).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_load_missing_snapshot_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.bin");

        let err = PatternMemory::load(&path, &MemoryConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("absent.bin"));
    }
}
