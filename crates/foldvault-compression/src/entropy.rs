//! Entropy (Huffman) codec
//!
//! Wire format: `varint(decoded_len) varint(symbol_count)`, then one
//! `u8 symbol, varint(frequency)` pair per symbol in ascending symbol order,
//! then the MSB-first bitstream padded with zeros to a byte boundary. The
//! decoder rebuilds the identical tree from the frequency table.

use crate::algorithms::Codec;
use crate::analyzer::ContentAnalysis;
use crate::varint;
use foldvault_types::{Error, Result, StrategyId};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

const TAG: &str = "entropy";
const MAX_CODE_LEN: u8 = 64;

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf(u8),
    Internal { zero: usize, one: usize },
}

/// Huffman tree stored as an arena; the root is the last node
#[derive(Debug)]
struct HuffmanTree {
    nodes: Vec<Node>,
}

impl HuffmanTree {
    /// Build from a frequency table; `None` when no symbol occurs
    ///
    /// Ties break on the symbol value for leaves and on creation order for
    /// internal nodes, so encoder and decoder always agree.
    fn build(frequencies: &[u64; 256]) -> Option<Self> {
        let mut nodes = Vec::with_capacity(511);
        let mut heap = BinaryHeap::new();

        for (symbol, &weight) in frequencies.iter().enumerate() {
            if weight > 0 {
                heap.push(Reverse((weight, symbol, nodes.len())));
                nodes.push(Node::Leaf(symbol as u8));
            }
        }

        let mut next_tiebreak = 256;
        while heap.len() > 1 {
            let Reverse((w0, _, zero)) = heap.pop()?;
            let Reverse((w1, _, one)) = heap.pop()?;
            heap.push(Reverse((w0.saturating_add(w1), next_tiebreak, nodes.len())));
            nodes.push(Node::Internal { zero, one });
            next_tiebreak += 1;
        }

        heap.pop().map(|_| Self { nodes })
    }

    fn root(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Code table indexed by symbol: `(bits, length)`
    fn codes(&self) -> Result<Vec<(u64, u8)>> {
        let mut table = vec![(0u64, 0u8); 256];
        let root = self.root();

        if let Node::Leaf(symbol) = self.nodes[root] {
            table[symbol as usize] = (0, 1);
            return Ok(table);
        }

        let mut stack = vec![(root, 0u64, 0u8)];
        while let Some((index, bits, len)) = stack.pop() {
            match self.nodes[index] {
                Node::Leaf(symbol) => table[symbol as usize] = (bits, len),
                Node::Internal { zero, one } => {
                    if len >= MAX_CODE_LEN {
                        return Err(Error::strategy_failure(TAG, "code length overflow"));
                    }
                    stack.push((zero, bits << 1, len + 1));
                    stack.push((one, (bits << 1) | 1, len + 1));
                }
            }
        }

        Ok(table)
    }
}

struct BitWriter {
    out: Vec<u8>,
    current: u8,
    filled: u8,
}

impl BitWriter {
    fn new(out: Vec<u8>) -> Self {
        Self {
            out,
            current: 0,
            filled: 0,
        }
    }

    fn write(&mut self, bits: u64, len: u8) {
        for shift in (0..len).rev() {
            self.current = (self.current << 1) | ((bits >> shift) & 1) as u8;
            self.filled += 1;
            if self.filled == 8 {
                self.out.push(self.current);
                self.current = 0;
                self.filled = 0;
            }
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.out.push(self.current << (8 - self.filled));
        }
        self.out
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn next(&mut self) -> Result<bool> {
        let byte = self
            .data
            .get(self.bit_pos / 8)
            .ok_or_else(|| Error::strategy_failure(TAG, "truncated bitstream"))?;
        let bit = (byte >> (7 - self.bit_pos % 8)) & 1;
        self.bit_pos += 1;
        Ok(bit == 1)
    }

    fn bytes_consumed(&self) -> usize {
        self.bit_pos.div_ceil(8)
    }
}

/// Huffman codec
#[derive(Debug, Clone, Copy)]
pub struct EntropyCodec {
    max_output: usize,
}

impl EntropyCodec {
    /// Minimum input size for which the frequency table can pay for itself
    pub const MIN_SIZE: usize = 32;

    /// Create an entropy codec
    pub fn new(max_output: usize) -> Self {
        Self { max_output }
    }
}

impl Codec for EntropyCodec {
    fn id(&self) -> StrategyId {
        StrategyId::Entropy
    }

    fn is_applicable(&self, analysis: &ContentAnalysis) -> bool {
        analysis.size >= Self::MIN_SIZE && analysis.unique_symbols >= 2
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut frequencies = [0u64; 256];
        for &byte in data {
            frequencies[byte as usize] += 1;
        }

        let mut header = Vec::with_capacity(data.len() / 2 + 64);
        varint::write(&mut header, data.len() as u64);
        let present: Vec<(usize, u64)> = frequencies
            .iter()
            .enumerate()
            .filter(|(_, &f)| f > 0)
            .map(|(symbol, &f)| (symbol, f))
            .collect();
        varint::write(&mut header, present.len() as u64);
        for &(symbol, frequency) in &present {
            header.push(symbol as u8);
            varint::write(&mut header, frequency);
        }

        let Some(tree) = HuffmanTree::build(&frequencies) else {
            return Ok(header);
        };
        let codes = tree.codes()?;

        let mut writer = BitWriter::new(header);
        for &byte in data {
            let (bits, len) = codes[byte as usize];
            writer.write(bits, len);
        }
        Ok(writer.finish())
    }

    fn decode_bounded(&self, data: &[u8], limit: usize) -> Result<Vec<u8>> {
        let mut pos = 0;
        let total = varint::read_len(data, &mut pos, limit, TAG)?;
        let symbol_count = varint::read_len(data, &mut pos, 256, TAG)?;

        let mut frequencies = [0u64; 256];
        let mut sum = 0u64;
        let mut last_symbol: Option<u8> = None;
        for _ in 0..symbol_count {
            let symbol = *data
                .get(pos)
                .ok_or_else(|| Error::strategy_failure(TAG, "truncated frequency table"))?;
            pos += 1;
            if last_symbol.is_some_and(|last| symbol <= last) {
                return Err(Error::strategy_failure(TAG, "frequency table out of order"));
            }
            last_symbol = Some(symbol);

            let frequency = varint::read(data, &mut pos, TAG)?;
            if frequency == 0 {
                return Err(Error::strategy_failure(TAG, "zero frequency in table"));
            }
            frequencies[symbol as usize] = frequency;
            sum = sum.saturating_add(frequency);
        }

        if sum != total as u64 {
            return Err(Error::strategy_failure(
                TAG,
                format!("frequency total {} does not match length {}", sum, total),
            ));
        }

        let Some(tree) = HuffmanTree::build(&frequencies) else {
            if pos != data.len() {
                return Err(Error::strategy_failure(TAG, "trailing bytes after empty table"));
            }
            return Ok(Vec::new());
        };

        let mut reader = BitReader {
            data: &data[pos..],
            bit_pos: 0,
        };
        let root = tree.root();
        let mut out = Vec::with_capacity(total);

        while out.len() < total {
            let mut index = root;
            if let Node::Leaf(symbol) = tree.nodes[index] {
                reader.next()?;
                out.push(symbol);
                continue;
            }
            loop {
                match tree.nodes[index] {
                    Node::Leaf(symbol) => {
                        out.push(symbol);
                        break;
                    }
                    Node::Internal { zero, one } => {
                        index = if reader.next()? { one } else { zero };
                    }
                }
            }
        }

        if pos + reader.bytes_consumed() != data.len() {
            return Err(Error::strategy_failure(TAG, "trailing bytes after bitstream"));
        }

        Ok(out)
    }

    fn max_output(&self) -> usize {
        self.max_output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;

    fn codec() -> EntropyCodec {
        EntropyCodec::new(1 << 24)
    }

    #[test]
    fn test_skewed_text_shrinks() {
        let data = b"aaaaaaaabbbbccd ".repeat(64);
        let encoded = codec().encode(&data).unwrap();
        assert!(encoded.len() < data.len() / 2);
        assert_eq!(codec().decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_single_symbol() {
        let data = vec![b'x'; 100];
        let encoded = codec().encode(&data).unwrap();
        assert_eq!(codec().decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_empty() {
        let encoded = codec().encode(b"").unwrap();
        assert_eq!(encoded, vec![0, 0]);
        assert!(codec().decode(&encoded).unwrap().is_empty());
    }

    #[test]
    fn test_all_symbols() {
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let encoded = codec().encode(&data).unwrap();
        assert_eq!(codec().decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_tree_is_deterministic() {
        let mut frequencies = [0u64; 256];
        frequencies[b'a' as usize] = 5;
        frequencies[b'b' as usize] = 5;
        frequencies[b'c' as usize] = 5;
        let first = HuffmanTree::build(&frequencies).unwrap().codes().unwrap();
        let second = HuffmanTree::build(&frequencies).unwrap().codes().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_corrupt_table() {
        let codec = codec();
        let mut encoded = codec.encode(&b"abcabcabcabcabcabcabcabcabcabcabc".repeat(2)).unwrap();
        // bump the declared length so frequencies no longer add up
        encoded[0] += 1;
        assert!(codec.decode(&encoded).is_err());
    }

    #[test]
    fn test_rejects_truncated_stream() {
        let codec = codec();
        let data = b"the rain in spain stays mainly in the plain".repeat(4);
        let encoded = codec.encode(&data).unwrap();
        assert!(codec.decode(&encoded[..encoded.len() - 2]).is_err());
    }

    #[test]
    fn test_applicability() {
        let codec = codec();
        assert!(!codec.is_applicable(&analyze(b"short")));
        assert!(!codec.is_applicable(&analyze(&[b'q'; 64])));
        assert!(codec.is_applicable(&analyze(&b"ab".repeat(32))));
    }
}
