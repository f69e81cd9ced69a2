//! Adaptive strategy selection
//!
//! Picks the best codec for one input by actually running the candidates.
//! Which candidates are tried depends on the input size; above the large
//! threshold the pattern memory decides the order and the trial cap applies.
//! Nothing is accepted unless it decodes back to the exact input and is
//! strictly smaller.

use crate::algorithms::{Codec, StrategyMetadata};
use crate::analyzer::ContentAnalysis;
use crate::memory::PatternMemory;
use crate::registry::StrategyRegistry;
use foldvault_types::{Error, Result, SelectorConfig, StrategyId};
use std::sync::Arc;
use tracing::debug;

/// Outcome of selecting a strategy for one input
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Winning strategy, Passthrough when nothing beat the input
    pub strategy: StrategyId,
    /// Encoded bytes produced by the winner
    pub encoded: Vec<u8>,
    /// Winner's trace metadata
    pub metadata: StrategyMetadata,
    /// Input size in bytes
    pub input_size: usize,
    /// Strategies actually executed, in trial order
    pub trials: Vec<StrategyId>,
    /// Candidates that failed or did not shrink the input, with the reason
    pub rejected: Vec<(StrategyId, String)>,
    /// `min(1, target_ratio / achieved_ratio)`, for reporting only
    pub quality_score: f64,
}

impl Selection {
    /// `encoded / input`, 1.0 for empty input
    pub fn ratio(&self) -> f64 {
        if self.input_size == 0 {
            1.0
        } else {
            self.encoded.len() as f64 / self.input_size as f64
        }
    }

    /// Whether the input was left untouched
    pub fn is_passthrough(&self) -> bool {
        self.strategy.is_passthrough()
    }
}

/// Reporting-only quality of an achieved ratio against a class target
pub fn quality_score(target_ratio: f64, achieved_ratio: f64) -> f64 {
    if achieved_ratio <= 0.0 {
        return 1.0;
    }
    (target_ratio / achieved_ratio).min(1.0)
}

/// Size-banded, memory-guided strategy selector
#[derive(Debug, Clone)]
pub struct AdaptiveSelector {
    registry: Arc<StrategyRegistry>,
    memory: Arc<PatternMemory>,
    config: SelectorConfig,
}

impl AdaptiveSelector {
    /// Create a selector over `registry`, guided by `memory`
    pub fn new(
        registry: Arc<StrategyRegistry>,
        memory: Arc<PatternMemory>,
        config: SelectorConfig,
    ) -> Self {
        Self {
            registry,
            memory,
            config,
        }
    }

    /// Registry the selector draws codecs from
    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    /// Pattern memory guiding trial order
    pub fn memory(&self) -> &Arc<PatternMemory> {
        &self.memory
    }

    /// Selector thresholds
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Candidate codecs for `analysis`, in trial order
    pub fn candidates(&self, analysis: &ContentAnalysis) -> Vec<&dyn Codec> {
        let size = analysis.size;
        let applicable = |codec: &&dyn Codec| {
            !codec.id().is_passthrough() && codec.is_applicable(analysis)
        };

        if size <= self.config.raw_threshold {
            return Vec::new();
        }

        if size <= self.config.small_threshold {
            return self
                .registry
                .codecs()
                .filter(|c| c.is_cheap())
                .filter(applicable)
                .collect();
        }

        if size <= self.config.large_threshold {
            return self.registry.codecs().filter(applicable).collect();
        }

        let mut ordered: Vec<&dyn Codec> = Vec::new();
        for strategy in self.memory.recommend(analysis.signature) {
            if let Some(codec) = self.registry.get(strategy) {
                ordered.push(codec);
            }
        }
        for codec in self.registry.codecs() {
            if !ordered.iter().any(|c| c.id() == codec.id()) {
                ordered.push(codec);
            }
        }

        ordered
            .into_iter()
            .filter(applicable)
            .take(self.config.max_trials)
            .collect()
    }

    /// Select the best strategy for `content`
    ///
    /// Never fails: codec errors reject that candidate and Passthrough is
    /// always available.
    pub fn select(&self, content: &[u8], analysis: &ContentAnalysis) -> Selection {
        let target = analysis.content_class.target_ratio();
        let mut trials = Vec::new();
        let mut rejected = Vec::new();
        let mut best: Option<(StrategyId, Vec<u8>, StrategyMetadata)> = None;

        for codec in self.candidates(analysis) {
            let strategy = codec.id();
            trials.push(strategy);

            match try_codec(codec, content) {
                Ok(encoded) => {
                    debug!(
                        "Strategy {} produced {} -> {} bytes",
                        strategy,
                        content.len(),
                        encoded.len()
                    );
                    let improves = best
                        .as_ref()
                        .map_or(true, |(_, current, _)| encoded.len() < current.len());
                    if improves {
                        best = Some((strategy, encoded, codec.metadata()));
                    }
                }
                Err(e) => {
                    debug!("Strategy {} rejected: {}", strategy, e);
                    rejected.push((strategy, e.to_string()));
                }
            }
        }

        let (strategy, encoded, metadata) = match best {
            Some(winner) => winner,
            None => (
                StrategyId::Passthrough,
                content.to_vec(),
                self.registry
                    .get(StrategyId::Passthrough)
                    .map(|c| c.metadata())
                    .unwrap_or_default(),
            ),
        };

        let mut selection = Selection {
            strategy,
            encoded,
            metadata,
            input_size: content.len(),
            trials,
            rejected,
            quality_score: 0.0,
        };
        selection.quality_score = quality_score(target, selection.ratio());

        debug!(
            "Selected {} for {} bytes ({} class): ratio={:.3}, trials={}",
            selection.strategy,
            content.len(),
            analysis.content_class,
            selection.ratio(),
            selection.trials.len()
        );
        selection
    }
}

/// Encode, decode and verify one candidate
fn try_codec(codec: &dyn Codec, content: &[u8]) -> Result<Vec<u8>> {
    let tag = codec.id().as_str();
    let encoded = codec.encode(content)?;
    let decoded = codec.decode(&encoded)?;

    if decoded != content {
        return Err(Error::strategy_failure(tag, "decode did not reproduce the input"));
    }
    if encoded.len() >= content.len() {
        return Err(Error::strategy_failure(
            tag,
            format!("no size reduction ({} >= {})", encoded.len(), content.len()),
        ));
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use foldvault_types::{CodecConfig, ContentClass, MemoryConfig};
    use rstest::rstest;

    fn selector() -> AdaptiveSelector {
        AdaptiveSelector::new(
            Arc::new(StrategyRegistry::new(&CodecConfig::default())),
            Arc::new(PatternMemory::new(&MemoryConfig::default())),
            SelectorConfig::default(),
        )
    }

    fn pseudo_random(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 8) as u8
            })
            .collect()
    }

    #[test]
    fn test_tiny_input_is_passthrough() {
        let selector = selector();
        let content = b"tiny";
        let selection = selector.select(content, &analyze(content));
        assert_eq!(selection.strategy, StrategyId::Passthrough);
        assert_eq!(selection.encoded, content);
        assert!(selection.trials.is_empty());
    }

    #[test]
    fn test_random_bytes_never_expand() {
        let selector = selector();
        let content = pseudo_random(12, 7);
        let selection = selector.select(&content, &analyze(&content));
        assert_eq!(selection.strategy, StrategyId::Passthrough);
        assert_eq!(selection.encoded.len(), content.len());
    }

    #[test]
    fn test_long_run_prefers_run_length() {
        let selector = selector();
        let content = vec![b'A'; 10_000];
        let selection = selector.select(&content, &analyze(&content));
        assert_eq!(selection.strategy, StrategyId::RunLength);
        assert!(selection.ratio() < 0.001);
        assert!((selection.quality_score - 1.0).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case(120, &[StrategyId::RunLength, StrategyId::Deflate])]
    #[case(400, &[StrategyId::RunLength, StrategyId::Dictionary, StrategyId::Entropy, StrategyId::Deflate])]
    fn test_size_bands(#[case] size: usize, #[case] expected: &[StrategyId]) {
        let selector = selector();
        let content = b"aaaaaaaab".repeat(size / 9 + 1)[..size].to_vec();
        let analysis = analyze(&content);
        let ids: Vec<StrategyId> = selector
            .candidates(&analysis)
            .iter()
            .map(|c| c.id())
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_large_input_follows_memory_and_cap() {
        let config = SelectorConfig {
            max_trials: 2,
            ..SelectorConfig::default()
        };
        let memory = Arc::new(PatternMemory::new(&MemoryConfig::default()));
        let selector = AdaptiveSelector::new(
            Arc::new(StrategyRegistry::new(&CodecConfig::default())),
            Arc::clone(&memory),
            config,
        );

        let content = b"struct Point { x: i32, y: i32 }\n".repeat(40);
        let analysis = analyze(&content);
        memory.observe(analysis.signature, StrategyId::Entropy, 0.2);

        let ids: Vec<StrategyId> = selector
            .candidates(&analysis)
            .iter()
            .map(|c| c.id())
            .collect();
        // no runs in the content, so run-length is not applicable
        assert_eq!(ids, vec![StrategyId::Entropy, StrategyId::Dictionary]);
    }

    #[test]
    fn test_quality_score() {
        assert!((quality_score(0.35, 0.70) - 0.5).abs() < 1e-9);
        assert_eq!(quality_score(0.35, 0.10), 1.0);
        assert_eq!(quality_score(ContentClass::Unknown.target_ratio(), 0.0), 1.0);
    }
}
