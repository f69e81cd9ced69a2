//! Configuration types for FoldVault components
//!
//! Each component of the engine takes one of these structures. They carry
//! defaults and a `validate` method; `foldvault-config` composes them into the
//! layered application configuration.

// Serde is imported conditionally through cfg_attr

/// Size bands and trial budget for the adaptive selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SelectorConfig {
    /// Content at or below this size is stored as-is
    pub raw_threshold: usize,
    /// Content at or below this size only tries the cheap subset
    pub small_threshold: usize,
    /// Content above this size is ordered by pattern memory and trial-capped
    pub large_threshold: usize,
    /// Maximum number of codecs tried for large content
    pub max_trials: usize,
}

impl SelectorConfig {
    /// Check threshold ordering and trial budget
    pub fn validate(&self) -> Result<(), String> {
        if self.raw_threshold >= self.small_threshold {
            return Err(format!(
                "raw_threshold ({}) must be below small_threshold ({})",
                self.raw_threshold, self.small_threshold
            ));
        }
        if self.small_threshold > self.large_threshold {
            return Err(format!(
                "small_threshold ({}) must not exceed large_threshold ({})",
                self.small_threshold, self.large_threshold
            ));
        }
        if self.max_trials == 0 {
            return Err("max_trials must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            raw_threshold: 50,
            small_threshold: 200,
            large_threshold: 500,
            max_trials: 5,
        }
    }
}

/// Stopping rules for the folding pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Maximum number of stages in one trace
    pub max_stages: usize,
    /// Minimum fractional size reduction a follow-up stage must achieve
    pub min_improvement: f64,
}

impl PipelineConfig {
    /// Hard ceiling on `max_stages`
    pub const MAX_STAGES: usize = 16;

    /// Check stage bounds and the improvement threshold
    pub fn validate(&self) -> Result<(), String> {
        if self.max_stages == 0 || self.max_stages > Self::MAX_STAGES {
            return Err(format!(
                "max_stages must be between 1 and {}, got {}",
                Self::MAX_STAGES,
                self.max_stages
            ));
        }
        if !(0.0..1.0).contains(&self.min_improvement) {
            return Err(format!(
                "min_improvement must be in [0, 1), got {}",
                self.min_improvement
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_stages: 4,
            min_improvement: 0.05,
        }
    }
}

/// Tuning for the built-in codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CodecConfig {
    /// Shortest run the run-length codec tokenises
    pub rle_min_run: usize,
    /// Back-reference window of the dictionary codec
    pub dictionary_window: usize,
    /// Longest match the dictionary codec emits
    pub dictionary_max_match: usize,
    /// Hash chain candidates examined per position
    pub dictionary_chain_depth: usize,
    /// Deflate compression level (0-9)
    pub deflate_level: u32,
    /// Upper bound on any decoded stage output
    pub max_decoded_size: usize,
}

impl CodecConfig {
    /// Largest window addressable by a 16-bit offset
    pub const MAX_WINDOW: usize = u16::MAX as usize;
    /// Shortest back-reference
    pub const MIN_MATCH: usize = 4;
    /// Longest back-reference representable in one length byte
    pub const MAX_MATCH: usize = Self::MIN_MATCH + u8::MAX as usize;

    /// Check codec parameter ranges
    pub fn validate(&self) -> Result<(), String> {
        if self.rle_min_run < 2 {
            return Err(format!("rle_min_run must be at least 2, got {}", self.rle_min_run));
        }
        if self.dictionary_window == 0 || self.dictionary_window > Self::MAX_WINDOW {
            return Err(format!(
                "dictionary_window must be between 1 and {}, got {}",
                Self::MAX_WINDOW,
                self.dictionary_window
            ));
        }
        if self.dictionary_max_match < Self::MIN_MATCH || self.dictionary_max_match > Self::MAX_MATCH
        {
            return Err(format!(
                "dictionary_max_match must be between {} and {}, got {}",
                Self::MIN_MATCH,
                Self::MAX_MATCH,
                self.dictionary_max_match
            ));
        }
        if self.dictionary_chain_depth == 0 {
            return Err("dictionary_chain_depth must be greater than 0".to_string());
        }
        if self.deflate_level > 9 {
            return Err(format!("deflate_level must be 0-9, got {}", self.deflate_level));
        }
        if self.max_decoded_size == 0 {
            return Err("max_decoded_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            rle_min_run: 4,
            dictionary_window: 32 * 1024,
            dictionary_max_match: 258,
            dictionary_chain_depth: 32,
            deflate_level: 6,
            max_decoded_size: 256 * 1024 * 1024, // 256MB
        }
    }
}

/// Bounds for the content index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IndexConfig {
    /// Build an index on store
    pub enabled: bool,
    /// Maximum distinct tokens in the token map
    pub max_tokens: usize,
    /// Maximum positions kept per token
    pub max_positions: usize,
    /// Maximum structural landmarks
    pub max_landmarks: usize,
    /// Content length from which a segment table is built
    pub segment_threshold: usize,
    /// Length of one segment
    pub segment_size: usize,
}

impl IndexConfig {
    /// Check index bounds
    pub fn validate(&self) -> Result<(), String> {
        if self.max_positions == 0 {
            return Err("max_positions must be greater than 0".to_string());
        }
        if self.segment_size == 0 {
            return Err("segment_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tokens: 4096,
            max_positions: 64,
            max_landmarks: 256,
            segment_threshold: 64 * 1024, // 64KB
            segment_size: 16 * 1024,      // 16KB
        }
    }
}

/// Capacity and averaging window of the pattern memory
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MemoryConfig {
    /// Maximum number of signatures kept before LRU eviction
    pub capacity: usize,
    /// Sample count after which the running average becomes exponential
    pub weight_window: u64,
    /// Optional snapshot file loaded on start and written on save
    pub snapshot_path: Option<std::path::PathBuf>,
}

impl MemoryConfig {
    /// Check capacity and window
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("pattern memory capacity must be greater than 0".to_string());
        }
        if self.weight_window == 0 {
            return Err("weight_window must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            weight_window: 32,
            snapshot_path: None,
        }
    }
}
