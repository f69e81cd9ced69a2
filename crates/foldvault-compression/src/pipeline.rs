//! Folding pipeline
//!
//! Applies the selector repeatedly, each stage working on the previous
//! stage's output, and records every kept stage in a [`PipelineTrace`] so the
//! payload can be unfolded later. Passthrough stages are never recorded: an
//! empty trace means the payload is the original content.

use crate::adaptive::{quality_score, AdaptiveSelector};
use crate::algorithms::StrategyMetadata;
use crate::analyzer::analyze;
use crate::memory::PatternMemory;
use crate::registry::StrategyRegistry;
use foldvault_types::{
    CodecConfig, ContentClass, Error, MemoryConfig, PipelineConfig, Result, SelectorConfig,
    StrategyId,
};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lower-case hex SHA-256 of `content`
pub fn integrity_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// One applied transform
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FoldingStage {
    /// Persisted strategy tag
    pub strategy_id: String,
    /// Bytes entering the stage
    pub input_size: u64,
    /// Bytes leaving the stage
    pub output_size: u64,
    /// Codec parameters at encode time
    pub strategy_metadata: StrategyMetadata,
}

impl FoldingStage {
    /// `output / input` for this stage
    pub fn ratio(&self) -> f64 {
        if self.input_size == 0 {
            1.0
        } else {
            self.output_size as f64 / self.input_size as f64
        }
    }
}

/// Ordered stages, first applied first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PipelineTrace {
    /// Applied stages
    pub stages: Vec<FoldingStage>,
}

impl PipelineTrace {
    /// Whether the payload is the untouched content
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Strategy tags in application order
    pub fn strategy_ids(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.strategy_id.as_str()).collect()
    }

    /// Human-readable summary, e.g. `rle(10000->5)`
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PipelineTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stages.is_empty() {
            return f.write_str("passthrough");
        }
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            write!(
                f,
                "{}({}->{})",
                stage.strategy_id, stage.input_size, stage.output_size
            )?;
        }
        Ok(())
    }
}

/// Result of folding one input
#[derive(Debug, Clone, PartialEq)]
pub struct FoldOutcome {
    /// Stages applied
    pub trace: PipelineTrace,
    /// Final bytes
    pub payload: Vec<u8>,
    /// Size of the original content
    pub original_size: usize,
    /// `payload / original`, 1.0 for empty content
    pub ratio: f64,
    /// Reporting-only quality against the class target
    pub quality_score: f64,
    /// Detected or hinted class of the original content
    pub content_class: ContentClass,
    /// Hex SHA-256 of the original content
    pub integrity_hash: String,
}

/// Multi-stage folding pipeline
#[derive(Debug, Clone)]
pub struct FoldingPipeline {
    selector: AdaptiveSelector,
    config: PipelineConfig,
}

impl FoldingPipeline {
    /// Create a pipeline around `selector`
    pub fn new(selector: AdaptiveSelector, config: PipelineConfig) -> Self {
        Self { selector, config }
    }

    /// Build the registry, memory and selector from component configs
    pub fn from_configs(
        codecs: &CodecConfig,
        selector: SelectorConfig,
        pipeline: PipelineConfig,
        memory: Arc<PatternMemory>,
    ) -> Self {
        let registry = Arc::new(StrategyRegistry::new(codecs));
        Self::new(AdaptiveSelector::new(registry, memory, selector), pipeline)
    }

    /// Selector driving each stage
    pub fn selector(&self) -> &AdaptiveSelector {
        &self.selector
    }

    /// Registry used for folding and unfolding
    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        self.selector.registry()
    }

    /// Pattern memory updated by every fold
    pub fn memory(&self) -> &Arc<PatternMemory> {
        self.selector.memory()
    }

    /// Pipeline limits
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fold `content` through as many stages as keep paying off
    pub fn fold(&self, content: &[u8], class_hint: Option<ContentClass>) -> FoldOutcome {
        let original = analyze(content).with_class_hint(class_hint);
        let content_class = original.content_class;
        let memory = self.memory();

        let mut stages = Vec::new();
        let mut current = content.to_vec();
        let mut analysis = original;

        for stage in 0..self.config.max_stages {
            if stage > 0 {
                analysis = analyze(&current).with_class_hint(class_hint);
            }

            let selection = self.selector.select(&current, &analysis);
            if selection.is_passthrough() {
                if stage == 0 {
                    memory.observe(analysis.signature, StrategyId::Passthrough, 1.0);
                }
                debug!("Stage {} stopped folding: passthrough selected", stage + 1);
                break;
            }

            let ratio = selection.ratio();
            if stage > 0 && 1.0 - ratio < self.config.min_improvement {
                debug!(
                    "Stage {} discarded: {} improved only {:.3}",
                    stage + 1,
                    selection.strategy,
                    1.0 - ratio
                );
                break;
            }

            memory.observe(analysis.signature, selection.strategy, ratio);
            debug!(
                "Stage {} applied {}: {} -> {} bytes",
                stage + 1,
                selection.strategy,
                current.len(),
                selection.encoded.len()
            );
            stages.push(FoldingStage {
                strategy_id: selection.strategy.as_str().to_string(),
                input_size: current.len() as u64,
                output_size: selection.encoded.len() as u64,
                strategy_metadata: selection.metadata,
            });
            current = selection.encoded;
        }

        let ratio = if content.is_empty() {
            1.0
        } else {
            current.len() as f64 / content.len() as f64
        };

        FoldOutcome {
            trace: PipelineTrace { stages },
            payload: current,
            original_size: content.len(),
            ratio,
            quality_score: quality_score(content_class.target_ratio(), ratio),
            content_class,
            integrity_hash: integrity_hash(content),
        }
    }

    /// Undo every stage of `trace` without checking the final hash
    ///
    /// Each stage decodes at most its recorded `input_size`, so records
    /// folded under a larger codec limit still unfold. `record_id` only
    /// labels errors.
    pub fn reverse(&self, trace: &PipelineTrace, payload: &[u8], record_id: &str) -> Result<Vec<u8>> {
        if trace.len() > PipelineConfig::MAX_STAGES {
            return Err(Error::integrity(
                record_id,
                format!("trace has {} stages", trace.len()),
            ));
        }

        let mut current = payload.to_vec();
        for (index, stage) in trace.stages.iter().enumerate().rev() {
            let strategy: StrategyId = stage.strategy_id.parse()?;
            let codec = self.registry().require(strategy)?;

            if current.len() as u64 != stage.output_size {
                return Err(Error::integrity(
                    record_id,
                    format!(
                        "stage {} ({}) expected {} bytes, found {}",
                        index + 1,
                        strategy,
                        stage.output_size,
                        current.len()
                    ),
                ));
            }

            let limit = usize::try_from(stage.input_size).map_err(|_| {
                Error::integrity(
                    record_id,
                    format!("stage {} declares {} bytes", index + 1, stage.input_size),
                )
            })?;
            current = codec.decode_bounded(&current, limit).map_err(|e| {
                Error::integrity(
                    record_id,
                    format!("stage {} ({}) failed to decode: {}", index + 1, strategy, e),
                )
            })?;

            if current.len() as u64 != stage.input_size {
                return Err(Error::integrity(
                    record_id,
                    format!(
                        "stage {} ({}) restored {} bytes, expected {}",
                        index + 1,
                        strategy,
                        current.len(),
                        stage.input_size
                    ),
                ));
            }
        }

        Ok(current)
    }

    /// Undo every stage of `trace` and verify the result against
    /// `expected_hash`
    pub fn unfold(
        &self,
        trace: &PipelineTrace,
        payload: &[u8],
        expected_hash: &str,
        record_id: &str,
    ) -> Result<Vec<u8>> {
        let content = self.reverse(trace, payload, record_id)?;
        let actual = integrity_hash(&content);
        if !actual.eq_ignore_ascii_case(expected_hash) {
            error!("Integrity hash mismatch for record {}", record_id);
            return Err(Error::integrity(
                record_id,
                format!("hash mismatch: expected {}, got {}", expected_hash, actual),
            ));
        }
        Ok(content)
    }
}

impl Default for FoldingPipeline {
    fn default() -> Self {
        Self::from_configs(
            &CodecConfig::default(),
            SelectorConfig::default(),
            PipelineConfig::default(),
            Arc::new(PatternMemory::new(&MemoryConfig::default())),
        )
    }
}
