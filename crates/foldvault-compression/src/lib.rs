//! Adaptive multi-strategy compression for FoldVault
//!
//! This crate turns content into a compact, exactly reversible payload. It includes:
//!
//! - **Content analysis**: entropy, repetition, run length, class and a structural signature
//! - **Strategy registry**: five self-checked codecs behind one [`Codec`] trait
//! - **Pattern memory**: a bounded, shared record of which strategies worked for which signatures
//! - **Adaptive selection**: size-banded trials where only verified, shrinking output is accepted
//! - **Folding pipeline**: repeated selection with a persisted trace and SHA-256 verification
//!
//! # Features
//!
//! - `serde` (default): Enable serialization of traces and pattern-memory snapshots
//!
//! # Supported Strategies
//!
//! - **Passthrough**: identity, the fallback when nothing helps
//! - **Run-length**: escape-coded runs for long repeats of one byte
//! - **Dictionary**: LZSS back-references into a sliding window
//! - **Entropy**: Huffman coding with an embedded frequency table
//! - **Deflate**: raw deflate streams
//!
//! # Examples
//!
//! ```rust
//! use foldvault_compression::FoldingPipeline;
//!
//! let pipeline = FoldingPipeline::default();
//! let content = vec![b'A'; 10_000];
//!
//! let outcome = pipeline.fold(&content, None);
//! assert!(outcome.payload.len() < 16);
//!
//! let restored = pipeline.unfold(&outcome.trace, &outcome.payload, &outcome.integrity_hash, "doc")?;
//! assert_eq!(restored, content);
//! # Ok::<(), foldvault_types::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod adaptive;
pub mod algorithms;
pub mod analyzer;
pub mod dictionary;
pub mod entropy;
pub mod memory;
pub mod pipeline;
pub mod registry;
pub mod rle;
mod varint;


// Re-export main types
pub use adaptive::{quality_score, AdaptiveSelector, Selection};
pub use algorithms::{AlgorithmImpl, Codec, DeflateCodec, PassthroughCodec, StrategyMetadata};
pub use analyzer::{analyze, ContentAnalysis, ContentSignature};
pub use dictionary::DictionaryCodec;
pub use entropy::EntropyCodec;
pub use memory::{MemorySnapshot, PatternEntry, PatternMemory, StrategyStats};
pub use pipeline::{integrity_hash, FoldOutcome, FoldingPipeline, FoldingStage, PipelineTrace};
pub use registry::StrategyRegistry;
pub use rle::RunLengthCodec;
