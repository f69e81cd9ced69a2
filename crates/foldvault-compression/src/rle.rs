//! Run-length codec
//!
//! Wire format: the first byte is the escape symbol, chosen as the least
//! frequent byte of the input. After it, any byte other than the escape is a
//! literal. The escape introduces a token `varint(count) symbol` that expands
//! to `count` copies of `symbol`. Runs shorter than `min_run` stay literal;
//! occurrences of the escape byte are always tokenised.

use crate::algorithms::{Codec, StrategyMetadata};
use crate::analyzer::ContentAnalysis;
use crate::varint;
use foldvault_types::{Error, Result, StrategyId};

const TAG: &str = "rle";

/// Run-length codec
#[derive(Debug, Clone, Copy)]
pub struct RunLengthCodec {
    min_run: usize,
    max_output: usize,
}

impl RunLengthCodec {
    /// Create a codec that tokenises runs of at least `min_run` bytes
    pub fn new(min_run: usize, max_output: usize) -> Self {
        Self {
            min_run: min_run.max(2),
            max_output,
        }
    }

    fn pick_escape(data: &[u8]) -> u8 {
        let mut counts = [0u64; 256];
        for &byte in data {
            counts[byte as usize] += 1;
        }
        counts
            .iter()
            .enumerate()
            .min_by_key(|(symbol, &count)| (count, *symbol))
            .map_or(0, |(symbol, _)| symbol as u8)
    }
}

impl Codec for RunLengthCodec {
    fn id(&self) -> StrategyId {
        StrategyId::RunLength
    }

    fn is_applicable(&self, analysis: &ContentAnalysis) -> bool {
        analysis.longest_run >= self.min_run
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let escape = Self::pick_escape(data);
        let mut out = Vec::with_capacity(data.len() / 2 + 1);
        out.push(escape);

        let mut i = 0;
        while i < data.len() {
            let symbol = data[i];
            let mut run = 1;
            while i + run < data.len() && data[i + run] == symbol {
                run += 1;
            }

            if symbol == escape || run >= self.min_run {
                out.push(escape);
                varint::write(&mut out, run as u64);
                out.push(symbol);
            } else {
                out.extend(std::iter::repeat(symbol).take(run));
            }
            i += run;
        }

        Ok(out)
    }

    fn decode_bounded(&self, data: &[u8], limit: usize) -> Result<Vec<u8>> {
        let Some((&escape, body)) = data.split_first() else {
            return Err(Error::strategy_failure(TAG, "missing escape header"));
        };

        let mut out = Vec::with_capacity(body.len() * 2);
        let mut pos = 0;
        while pos < body.len() {
            let byte = body[pos];
            pos += 1;
            if byte != escape {
                out.push(byte);
                continue;
            }

            let remaining = limit.saturating_sub(out.len());
            let count = varint::read_len(body, &mut pos, remaining, TAG)?;
            if count == 0 {
                return Err(Error::strategy_failure(TAG, "zero-length run"));
            }
            let symbol = *body
                .get(pos)
                .ok_or_else(|| Error::strategy_failure(TAG, "run token missing symbol"))?;
            pos += 1;
            out.resize(out.len() + count, symbol);
        }

        if out.len() > limit {
            return Err(Error::strategy_failure(
                TAG,
                format!("decoded output exceeds {} bytes", limit),
            ));
        }
        Ok(out)
    }

    fn max_output(&self) -> usize {
        self.max_output
    }

    fn metadata(&self) -> StrategyMetadata {
        let mut metadata = StrategyMetadata::new();
        metadata.insert("min_run".to_string(), self.min_run.to_string());
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

    fn round_trip(data: &[u8]) -> Vec<u8> {
        let codec = RunLengthCodec::new(4, 1 << 20);
        let encoded = codec.encode(data).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), data);
        encoded
    }

    #[test]
    fn test_long_run_collapses() {
        let encoded = round_trip(&[b'A'; 10_000]);
        // escape + escape + varint(10000) + symbol
        assert_eq!(encoded.len(), 5);
    }

    #[test]
    fn test_short_runs_stay_literal() {
        let codec = RunLengthCodec::new(4, 1 << 20);
        let data = b"aabbbcdd";
        let encoded = codec.encode(data).unwrap();
        assert_eq!(&encoded[1..], data);
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_escape_byte_in_input() {
        let data: Vec<u8> = (0..=255u8).chain(0..=255u8).collect();
        round_trip(&data);
    }

    #[test]
    fn test_empty_input() {
        let encoded = round_trip(b"");
        assert_eq!(encoded.len(), 1);
    }

    #[test]
    fn test_applicability_follows_longest_run() {
        let codec = RunLengthCodec::new(4, 1 << 20);
        assert!(codec.is_applicable(&analyze(b"xxxxy")));
        assert!(!codec.is_applicable(&analyze(b"xyxyxy")));
    }

    #[test]
    fn test_output_limit() {
        let codec = RunLengthCodec::new(4, 1 << 20);
        let encoded = codec.encode(&[b'z'; 4096]).unwrap();
        assert!(RunLengthCodec::new(4, 1024).decode(&encoded).is_err());
    }

    #[test]
    fn test_literal_bytes_count_toward_limit() {
        let codec = RunLengthCodec::new(4, 1 << 20);
        let encoded = codec.encode(b"abcdefgh").unwrap();
        assert_eq!(codec.decode_bounded(&encoded, 8).unwrap(), b"abcdefgh");
        assert!(codec.decode_bounded(&encoded, 7).is_err());
    }

    #[test]
    fn test_malformed_input() {
        let codec = RunLengthCodec::new(4, 1 << 20);
        assert!(codec.decode(&[]).is_err());
        // escape, count 0
        assert!(codec.decode(&[7, 7, 0, b'a']).is_err());
        // escape, count, missing symbol
        assert!(codec.decode(&[7, 7, 3]).is_err());
    }
}
