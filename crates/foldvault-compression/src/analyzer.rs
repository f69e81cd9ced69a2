//! Content analysis
//!
//! Computes the cheap statistics the selector needs: Shannon entropy,
//! repetition, a symbol-frequency summary, the longest run, a coarse content
//! class and a non-cryptographic structural signature used to key the pattern
//! memory.

use foldvault_types::ContentClass;
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of most frequent symbols kept in the summary
const TOP_SYMBOLS: usize = 8;

/// Number of top symbols that feed the signature
const SIGNATURE_SYMBOLS: usize = 3;

/// Bytes sampled for classification
const CLASSIFY_SAMPLE: usize = 1024;

/// Cheap fingerprint of content characteristics
///
/// Collisions are expected and harmless: they only influence which codecs the
/// selector tries first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContentSignature(u64);

impl ContentSignature {
    /// Wrap a raw signature value
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Raw signature value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Result of analysing one input
#[derive(Debug, Clone, PartialEq)]
pub struct ContentAnalysis {
    /// Input length in bytes
    pub size: usize,
    /// Shannon entropy in bits per byte
    pub entropy: f64,
    /// `1 - unique_symbols / size`
    pub repetition_ratio: f64,
    /// Number of distinct byte values
    pub unique_symbols: usize,
    /// Most frequent symbols with their counts, descending
    pub top_symbols: Vec<(u8, u64)>,
    /// Length of the longest run of one byte value
    pub longest_run: usize,
    /// Coarse classification
    pub content_class: ContentClass,
    /// Structural fingerprint
    pub signature: ContentSignature,
}

impl ContentAnalysis {
    /// Whether the content has no bytes
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Replace the detected class with a caller-provided hint
    pub fn with_class_hint(mut self, hint: Option<ContentClass>) -> Self {
        if let Some(class) = hint {
            self.content_class = class;
        }
        self
    }
}

/// Analyse `content`
pub fn analyze(content: &[u8]) -> ContentAnalysis {
    let mut counts = [0u64; 256];
    let mut longest_run = 0usize;
    let mut current_run = 0usize;
    let mut previous: Option<u8> = None;

    for &byte in content {
        counts[byte as usize] += 1;
        if previous == Some(byte) {
            current_run += 1;
        } else {
            current_run = 1;
            previous = Some(byte);
        }
        longest_run = longest_run.max(current_run);
    }

    let size = content.len();
    let unique_symbols = counts.iter().filter(|&&c| c > 0).count();
    let entropy = shannon_entropy(&counts, size);
    let repetition_ratio = if size == 0 {
        0.0
    } else {
        1.0 - unique_symbols as f64 / size as f64
    };

    let mut ranked: Vec<(u8, u64)> = counts
        .iter()
        .enumerate()
        .filter(|(_, &c)| c > 0)
        .map(|(symbol, &c)| (symbol as u8, c))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(TOP_SYMBOLS);

    let signature = signature_for(size, unique_symbols, &ranked);

    ContentAnalysis {
        size,
        entropy,
        repetition_ratio,
        unique_symbols,
        top_symbols: ranked,
        longest_run,
        content_class: classify(content),
        signature,
    }
}

/// Shannon entropy of a byte histogram; 0 for empty or single-symbol input
pub fn shannon_entropy(counts: &[u64; 256], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }

    let len = total as f64;
    let mut entropy = 0.0;
    for &count in counts {
        if count > 0 {
            let p = count as f64 / len;
            entropy -= p * p.log2();
        }
    }

    // -0.0 for a single symbol
    entropy.max(0.0)
}

fn signature_for(size: usize, unique_symbols: usize, ranked: &[(u8, u64)]) -> ContentSignature {
    let length_bucket = (usize::BITS - size.leading_zeros()) as u8;
    let diversity_bucket = (unique_symbols / 16) as u8;

    let mut key = [0u8; 2 + SIGNATURE_SYMBOLS];
    key[0] = length_bucket;
    key[1] = diversity_bucket;
    for (slot, (symbol, _)) in key[2..].iter_mut().zip(ranked.iter()) {
        *slot = *symbol;
    }

    ContentSignature(xxh3_64(&key))
}

/// Classify content from a leading sample
pub fn classify(content: &[u8]) -> ContentClass {
    if content.is_empty() {
        return ContentClass::Unknown;
    }

    let sample = &content[..content.len().min(CLASSIFY_SAMPLE)];
    if sample.contains(&0) || !is_text_data(sample) {
        return ContentClass::Binary;
    }

    let trimmed = sample
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(&sample[..0], |start| &sample[start..]);

    match trimmed.first() {
        Some(b'{') | Some(b'[') => return ContentClass::Json,
        Some(b'<') => return ContentClass::Markup,
        _ => {}
    }

    let text = String::from_utf8_lossy(sample);
    if looks_like_code(&text) {
        ContentClass::Code
    } else {
        ContentClass::Text
    }
}

/// Check if data appears to be text
fn is_text_data(data: &[u8]) -> bool {
    let text_chars = data
        .iter()
        .filter(|&&b| {
            b.is_ascii_alphanumeric()
                || b.is_ascii_whitespace()
                || b.is_ascii_punctuation()
                || b >= 0x80
        })
        .count();

    text_chars as f64 / data.len() as f64 > 0.8
}

fn looks_like_code(text: &str) -> bool {
    const MARKERS: [&str; 8] = [
        "fn ", "def ", "function ", "class ", "struct ", "impl ", "import ", "#include",
    ];
    text.lines().any(|line| {
        let line = line.trim_start();
        MARKERS.iter().any(|marker| line.starts_with(marker))
            || line.starts_with("pub fn ")
            || line.starts_with("async fn ")
    })
}
