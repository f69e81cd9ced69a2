//! Dictionary (LZSS) codec
//!
//! Replaces repeated substrings with back-references into a sliding window.
//!
//! Wire format: `varint(decoded_len)` followed by groups of up to eight items,
//! each group led by a flag byte. Bit `i` of the flag (LSB first) marks item
//! `i` as a match, encoded as `u16 LE offset` plus `u8 (length - MIN_MATCH)`.
//! A clear bit marks a single literal byte.

use crate::algorithms::{Codec, StrategyMetadata};
use crate::analyzer::ContentAnalysis;
use crate::varint;
use foldvault_types::{CodecConfig, Error, Result, StrategyId};

const TAG: &str = "dictionary";
const HASH_BITS: u32 = 15;
const NO_POS: usize = usize::MAX;

/// Sliding-window dictionary codec
#[derive(Debug, Clone, Copy)]
pub struct DictionaryCodec {
    window: usize,
    max_match: usize,
    chain_depth: usize,
    max_output: usize,
}

impl DictionaryCodec {
    /// Minimum input size worth a dictionary pass
    pub const MIN_SIZE: usize = 16;

    /// Create a dictionary codec
    ///
    /// `window` and `max_match` are clamped to what the wire format can carry.
    pub fn new(window: usize, max_match: usize, chain_depth: usize, max_output: usize) -> Self {
        Self {
            window: window.clamp(1, CodecConfig::MAX_WINDOW),
            max_match: max_match.clamp(CodecConfig::MIN_MATCH, CodecConfig::MAX_MATCH),
            chain_depth: chain_depth.max(1),
            max_output,
        }
    }

    fn hash(data: &[u8], pos: usize) -> usize {
        let key = u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
        (key.wrapping_mul(2_654_435_761) >> (32 - HASH_BITS)) as usize
    }

    fn insert(data: &[u8], pos: usize, head: &mut [usize], prev: &mut [usize]) {
        if pos + CodecConfig::MIN_MATCH <= data.len() {
            let h = Self::hash(data, pos);
            prev[pos] = head[h];
            head[h] = pos;
        }
    }

    fn longest_match(
        &self,
        data: &[u8],
        pos: usize,
        head: &[usize],
        prev: &[usize],
    ) -> (usize, usize) {
        let limit = self.max_match.min(data.len() - pos);
        let mut best_len = 0;
        let mut best_offset = 0;
        let mut candidate = head[Self::hash(data, pos)];
        let mut depth = 0;

        while candidate != NO_POS && depth < self.chain_depth {
            let offset = pos - candidate;
            if offset > self.window {
                break;
            }

            let len = data[candidate..]
                .iter()
                .zip(&data[pos..pos + limit])
                .take_while(|(a, b)| a == b)
                .count();
            if len > best_len {
                best_len = len;
                best_offset = offset;
                if len == limit {
                    break;
                }
            }

            candidate = prev[candidate];
            depth += 1;
        }

        (best_len, best_offset)
    }
}

struct GroupWriter {
    out: Vec<u8>,
    flag_pos: usize,
    items: u8,
}

impl GroupWriter {
    fn new(out: Vec<u8>) -> Self {
        Self {
            out,
            flag_pos: 0,
            items: 8,
        }
    }

    fn begin_item(&mut self, is_match: bool) {
        if self.items == 8 {
            self.flag_pos = self.out.len();
            self.out.push(0);
            self.items = 0;
        }
        if is_match {
            self.out[self.flag_pos] |= 1 << self.items;
        }
        self.items += 1;
    }

    fn literal(&mut self, byte: u8) {
        self.begin_item(false);
        self.out.push(byte);
    }

    fn reference(&mut self, offset: usize, len: usize) {
        self.begin_item(true);
        self.out.extend_from_slice(&(offset as u16).to_le_bytes());
        self.out.push((len - CodecConfig::MIN_MATCH) as u8);
    }
}

impl Codec for DictionaryCodec {
    fn id(&self) -> StrategyId {
        StrategyId::Dictionary
    }

    fn is_applicable(&self, analysis: &ContentAnalysis) -> bool {
        analysis.size >= Self::MIN_SIZE
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut header = Vec::with_capacity(data.len() / 2 + 16);
        varint::write(&mut header, data.len() as u64);
        let mut writer = GroupWriter::new(header);

        let mut head = vec![NO_POS; 1 << HASH_BITS];
        let mut prev = vec![NO_POS; data.len()];
        let min_match = CodecConfig::MIN_MATCH;

        let mut pos = 0;
        while pos < data.len() {
            let (len, offset) = if pos + min_match <= data.len() {
                self.longest_match(data, pos, &head, &prev)
            } else {
                (0, 0)
            };

            let advance = if len >= min_match {
                writer.reference(offset, len);
                len
            } else {
                writer.literal(data[pos]);
                1
            };
            for p in pos..pos + advance {
                Self::insert(data, p, &mut head, &mut prev);
            }
            pos += advance;
        }

        Ok(writer.out)
    }

    fn decode_bounded(&self, data: &[u8], limit: usize) -> Result<Vec<u8>> {
        let mut pos = 0;
        let total = varint::read_len(data, &mut pos, limit, TAG)?;
        let mut out = Vec::with_capacity(total);

        while out.len() < total {
            let flags = *data
                .get(pos)
                .ok_or_else(|| Error::strategy_failure(TAG, "truncated flag byte"))?;
            pos += 1;

            for bit in 0..8 {
                if out.len() >= total {
                    break;
                }

                if flags & (1 << bit) == 0 {
                    let byte = *data
                        .get(pos)
                        .ok_or_else(|| Error::strategy_failure(TAG, "truncated literal"))?;
                    pos += 1;
                    out.push(byte);
                    continue;
                }

                let token = data
                    .get(pos..pos + 3)
                    .ok_or_else(|| Error::strategy_failure(TAG, "truncated match"))?;
                pos += 3;
                let offset = usize::from(u16::from_le_bytes([token[0], token[1]]));
                let len = usize::from(token[2]) + CodecConfig::MIN_MATCH;

                if offset == 0 || offset > out.len() {
                    return Err(Error::strategy_failure(
                        TAG,
                        format!("match offset {} outside window of {}", offset, out.len()),
                    ));
                }
                if out.len() + len > total {
                    return Err(Error::strategy_failure(TAG, "match runs past declared length"));
                }

                // Overlapping copies must go byte by byte.
                let start = out.len() - offset;
                for i in 0..len {
                    let byte = out[start + i];
                    out.push(byte);
                }
            }
        }

        if pos != data.len() {
            return Err(Error::strategy_failure(
                TAG,
                format!("{} trailing bytes", data.len() - pos),
            ));
        }

        Ok(out)
    }

    fn max_output(&self) -> usize {
        self.max_output
    }

    fn metadata(&self) -> StrategyMetadata {
        let mut metadata = StrategyMetadata::new();
        metadata.insert("window".to_string(), self.window.to_string());
        metadata.insert("max_match".to_string(), self.max_match.to_string());
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn codec() -> DictionaryCodec {
        DictionaryCodec::new(32_768, 258, 32, 1 << 24)
    }

    #[rstest]
    #[case(b"".to_vec())]
    #[case(b"abc".to_vec())]
    #[case(b"abcabcabcabcabcabcabcabc".to_vec())]
    #[case(vec![b'z'; 5000])]
    #[case((0..=255u8).cycle().take(3000).collect())]
    fn test_round_trip(#[case] data: Vec<u8>) {
        let codec = codec();
        let encoded = codec.encode(&data).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_repeated_text_shrinks() {
        let data = b"fn compute(x: u32) -> u32 { x * 2 }\n".repeat(50);
        let encoded = codec().encode(&data).unwrap();
        assert!(encoded.len() < data.len() / 4);
    }

    #[test]
    fn test_overlapping_match() {
        // offset 1, length 8: copies the previous byte repeatedly
        let encoded = [9, 0b0000_0010, b'q', 1, 0, 4];
        assert_eq!(codec().decode(&encoded).unwrap(), vec![b'q'; 9]);
    }

    #[test]
    fn test_rejects_bad_offset() {
        let encoded = [5, 0b0000_0010, b'a', 9, 0, 0];
        assert!(codec().decode(&encoded).is_err());
    }

    #[test]
    fn test_rejects_truncated_and_trailing() {
        let codec = codec();
        let encoded = codec.encode(b"hello hello hello hello").unwrap();
        assert!(codec.decode(&encoded[..encoded.len() - 1]).is_err());

        let mut padded = encoded.clone();
        padded.push(0);
        assert!(codec.decode(&padded).is_err());
    }

    #[test]
    fn test_declared_length_limit() {
        let encoded = codec().encode(&[1u8; 4096]).unwrap();
        assert!(DictionaryCodec::new(32_768, 258, 32, 1024).decode(&encoded).is_err());
    }
}
