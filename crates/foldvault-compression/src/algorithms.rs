//! Compression strategy implementations
//!
//! Every strategy implements [`Codec`]. The set of strategies is closed: a
//! [`StrategyId`] maps to exactly one codec through an exhaustive match in
//! [`AlgorithmImpl::create`], so there is no string dispatch at runtime.

use crate::analyzer::ContentAnalysis;
use crate::dictionary::DictionaryCodec;
use crate::entropy::EntropyCodec;
use crate::rle::RunLengthCodec;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use foldvault_types::{CodecConfig, Error, Result, StrategyId};
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Metadata recorded next to a stage in the pipeline trace
pub type StrategyMetadata = BTreeMap<String, String>;

/// Trait for compression strategy implementations
///
/// `decode(encode(x)) == x` must hold for every `x` the codec declares itself
/// applicable to. The registry and the selector both execute that check; a
/// codec is never trusted on its own word.
pub trait Codec: Send + Sync {
    /// Strategy implemented by this codec
    fn id(&self) -> StrategyId;

    /// Whether trying this codec on the analysed content makes sense
    fn is_applicable(&self, analysis: &ContentAnalysis) -> bool;

    /// Transform `data`
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Invert [`Codec::encode`] within the codec's own output limit
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.decode_bounded(data, self.max_output())
    }

    /// Invert [`Codec::encode`], refusing to produce more than `limit` bytes
    fn decode_bounded(&self, data: &[u8], limit: usize) -> Result<Vec<u8>>;

    /// Largest output [`Codec::decode`] accepts
    fn max_output(&self) -> usize {
        usize::MAX
    }

    /// Parameters worth recording in the pipeline trace
    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata::new()
    }

    /// Whether the codec belongs to the cheap subset tried on small inputs
    fn is_cheap(&self) -> bool {
        false
    }
}

/// Codec factory
pub struct AlgorithmImpl;

impl AlgorithmImpl {
    /// Create the codec for `strategy`
    pub fn create(strategy: StrategyId, config: &CodecConfig) -> Box<dyn Codec> {
        match strategy {
            StrategyId::Passthrough => Box::new(PassthroughCodec),
            StrategyId::RunLength => Box::new(RunLengthCodec::new(
                config.rle_min_run,
                config.max_decoded_size,
            )),
            StrategyId::Dictionary => Box::new(DictionaryCodec::new(
                config.dictionary_window,
                config.dictionary_max_match,
                config.dictionary_chain_depth,
                config.max_decoded_size,
            )),
            StrategyId::Entropy => Box::new(EntropyCodec::new(config.max_decoded_size)),
            StrategyId::Deflate => Box::new(DeflateCodec::new(
                config.deflate_level,
                config.max_decoded_size,
            )),
        }
    }

    /// Get all available strategies
    pub fn all_strategies() -> Vec<StrategyId> {
        StrategyId::all().to_vec()
    }
}

/// Identity transform
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCodec;

impl Codec for PassthroughCodec {
    fn id(&self) -> StrategyId {
        StrategyId::Passthrough
    }

    fn is_applicable(&self, _analysis: &ContentAnalysis) -> bool {
        true
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decode_bounded(&self, data: &[u8], limit: usize) -> Result<Vec<u8>> {
        if data.len() > limit {
            return Err(Error::strategy_failure(
                "passthrough",
                format!("{} bytes exceed the limit of {}", data.len(), limit),
            ));
        }
        Ok(data.to_vec())
    }

    fn is_cheap(&self) -> bool {
        true
    }
}

/// General-purpose raw deflate stream, the safety net for content the
/// specialised codecs handle poorly
#[derive(Debug, Clone, Copy)]
pub struct DeflateCodec {
    level: u32,
    max_output: usize,
}

impl DeflateCodec {
    /// Minimum input size worth deflating
    pub const MIN_SIZE: usize = 16;

    /// Create a deflate codec
    pub fn new(level: u32, max_output: usize) -> Self {
        Self {
            level: level.min(9),
            max_output,
        }
    }
}

impl Codec for DeflateCodec {
    fn id(&self) -> StrategyId {
        StrategyId::Deflate
    }

    fn is_applicable(&self, analysis: &ContentAnalysis) -> bool {
        analysis.size >= Self::MIN_SIZE
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(
            Vec::with_capacity(data.len() / 2 + 16),
            Compression::new(self.level),
        );
        encoder
            .write_all(data)
            .map_err(|e| Error::strategy_failure("deflate", format!("write failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| Error::strategy_failure("deflate", format!("finish failed: {}", e)))
    }

    fn decode_bounded(&self, data: &[u8], limit: usize) -> Result<Vec<u8>> {
        let mut decoded = Vec::new();
        DeflateDecoder::new(data)
            .take((limit as u64).saturating_add(1))
            .read_to_end(&mut decoded)
            .map_err(|e| Error::strategy_failure("deflate", format!("inflate failed: {}", e)))?;

        if decoded.len() > limit {
            return Err(Error::strategy_failure(
                "deflate",
                format!("decoded output exceeds {} bytes", limit),
            ));
        }
        Ok(decoded)
    }

    fn max_output(&self) -> usize {
        self.max_output
    }

    fn metadata(&self) -> StrategyMetadata {
        let mut metadata = StrategyMetadata::new();
        metadata.insert("level".to_string(), self.level.to_string());
        metadata
    }

    fn is_cheap(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;

    #[test]
    fn test_passthrough() {
        let codec = PassthroughCodec;
        let data = b"Hello, world!";

        let encoded = codec.encode(data).unwrap();
        let decoded = codec.decode(&encoded).unwrap();

        assert_eq!(data, encoded.as_slice());
        assert_eq!(data, decoded.as_slice());
        assert!(codec.is_applicable(&analyze(b"")));
    }

    #[test]
    fn test_deflate_compression() {
        let codec = DeflateCodec::new(6, 1 << 20);
        let data = b"Hello, world! This is a test string for compression.".repeat(10);

        let encoded = codec.encode(&data).unwrap();
        let decoded = codec.decode(&encoded).unwrap();

        assert_eq!(data, decoded);
        assert!(encoded.len() < data.len());
        assert_eq!(codec.metadata().get("level").map(String::as_str), Some("6"));
    }

    #[test]
    fn test_deflate_output_limit() {
        let codec = DeflateCodec::new(6, 1 << 20);
        let encoded = codec.encode(&vec![0u8; 4096]).unwrap();

        let limited = DeflateCodec::new(6, 1024);
        assert!(limited.decode(&encoded).is_err());
    }

    #[test]
    fn test_deflate_unbounded_limit() {
        let codec = DeflateCodec::new(6, usize::MAX);
        let data = b"abcdefgh".repeat(64);
        let encoded = codec.encode(&data).unwrap();

        assert_eq!(codec.decode(&encoded).unwrap(), data);
        assert_eq!(codec.decode_bounded(&encoded, data.len()).unwrap(), data);
        assert!(codec.decode_bounded(&encoded, data.len() - 1).is_err());
    }

    #[test]
    fn test_deflate_rejects_garbage() {
        let codec = DeflateCodec::new(6, 1 << 20);
        assert!(codec.decode(&[0xFF; 32]).is_err());
    }

    #[test]
    fn test_algorithm_factory() {
        let config = CodecConfig::default();
        for strategy in AlgorithmImpl::all_strategies() {
            let codec = AlgorithmImpl::create(strategy, &config);
            assert_eq!(codec.id(), strategy);
        }
    }
}
