//! Content index built at store time
//!
//! The index lets the engine answer line-range and term queries without
//! always decoding the payload. It holds a line offset table, a bounded
//! token map, cheap structural landmarks and, for large content, a segment
//! table with per-segment checksums.

use foldvault_types::{ContentClass, Error, IndexConfig, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Range;
use xxhash_rust::xxh3::xxh3_64;

/// Shortest indexed token
pub const MIN_TOKEN_LEN: usize = 2;
/// Longest indexed token
pub const MAX_TOKEN_LEN: usize = 64;

const CODE_PREFIXES: [&str; 6] = ["pub(crate) ", "pub ", "async ", "export ", "default ", "unsafe "];

const CODE_KEYWORDS: [(&str, LandmarkKind); 9] = [
    ("fn ", LandmarkKind::Function),
    ("def ", LandmarkKind::Function),
    ("function ", LandmarkKind::Function),
    ("class ", LandmarkKind::Type),
    ("struct ", LandmarkKind::Type),
    ("enum ", LandmarkKind::Type),
    ("trait ", LandmarkKind::Type),
    ("interface ", LandmarkKind::Type),
    ("impl ", LandmarkKind::Impl),
];

/// Kind of a structural landmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LandmarkKind {
    /// Function or method definition
    Function,
    /// Type definition (struct, class, enum, trait, interface)
    Type,
    /// Implementation block
    Impl,
    /// Markup tag
    Tag,
    /// Markdown heading
    Heading,
}

/// A named position inside the content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
    /// What was found
    pub kind: LandmarkKind,
    /// Identifier, tag name or heading text
    pub name: String,
    /// Zero-based line
    pub line: u64,
    /// Byte offset of the landmark
    pub offset: u64,
}

/// Fixed-size slice of the content with its checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Byte offset of the segment
    pub offset: u64,
    /// Length in bytes
    pub length: u64,
    /// xxh3-64 of the segment bytes
    pub checksum: u64,
}

impl Segment {
    /// Byte range covered by the segment
    pub fn range(&self) -> Range<u64> {
        self.offset..self.offset + self.length
    }

    /// Whether `bytes` hash to this segment's checksum
    pub fn verify(&self, bytes: &[u8]) -> bool {
        bytes.len() as u64 == self.length && xxh3_64(bytes) == self.checksum
    }
}

/// Lookup tables for one stored content
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentIndex {
    /// Length of the indexed content
    pub total_len: u64,
    /// Start offset of every line
    pub line_offsets: Vec<u64>,
    /// Token to ascending byte offsets of its whole-token occurrences
    pub tokens: BTreeMap<String, Vec<u64>>,
    /// Set when the distinct-token cap dropped tokens
    pub tokens_truncated: bool,
    /// Tokens whose position list hit the per-token cap
    pub saturated_tokens: BTreeSet<String>,
    /// Structural landmarks in content order
    pub landmarks: Vec<Landmark>,
    /// Segment length, 0 when no segment table was built
    pub segment_size: u64,
    /// Segment table
    pub segments: Vec<Segment>,
}

impl ContentIndex {
    /// Build the index for `content`
    pub fn build(content: &[u8], class: ContentClass, config: &IndexConfig) -> Self {
        let line_offsets = line_offsets(content);
        let (tokens, tokens_truncated, saturated_tokens) = build_tokens(content, config);

        let mut landmarks = match class {
            ContentClass::Code => code_landmarks(content, &line_offsets),
            ContentClass::Markup => markup_landmarks(content, &line_offsets),
            ContentClass::Text => heading_landmarks(content, &line_offsets),
            _ => Vec::new(),
        };
        landmarks.truncate(config.max_landmarks);

        let (segment_size, segments) =
            if !content.is_empty() && content.len() >= config.segment_threshold {
                let size = config.segment_size.max(1);
                let segments = content
                    .chunks(size)
                    .enumerate()
                    .map(|(i, chunk)| Segment {
                        offset: (i * size) as u64,
                        length: chunk.len() as u64,
                        checksum: xxh3_64(chunk),
                    })
                    .collect();
                (size as u64, segments)
            } else {
                (0, Vec::new())
            };

        Self {
            total_len: content.len() as u64,
            line_offsets,
            tokens,
            tokens_truncated,
            saturated_tokens,
            landmarks,
            segment_size,
            segments,
        }
    }

    /// Number of lines
    pub fn line_count(&self) -> u64 {
        self.line_offsets.len() as u64
    }

    /// Zero-based line holding byte `offset`
    pub fn line_of(&self, offset: u64) -> u64 {
        line_of(&self.line_offsets, offset)
    }

    /// Byte range of the inclusive lines `start..=end`
    ///
    /// `end` is clamped to the last line.
    pub fn line_range(&self, start: u64, end: u64) -> Result<Range<u64>> {
        line_range(&self.line_offsets, self.total_len, start, end)
    }

    /// Answer a term query from the token map
    ///
    /// Returns `None` when the map cannot give a complete answer and the
    /// caller has to scan the content instead.
    pub fn lookup(&self, term: &str, max_results: usize) -> Option<Vec<u64>> {
        if !is_token(term) {
            return None;
        }
        match self.tokens.get(term) {
            Some(positions) => {
                if self.saturated_tokens.contains(term) && max_results > positions.len() {
                    return None;
                }
                Some(positions.iter().copied().take(max_results).collect())
            }
            None if self.tokens_truncated => None,
            None => Some(Vec::new()),
        }
    }

    /// Whether a segment table exists
    pub fn has_segments(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Segments overlapping `range`
    pub fn segments_covering(&self, range: &Range<u64>) -> &[Segment] {
        if self.segments.is_empty() || range.start >= range.end {
            return &[];
        }
        let first = self.segments.partition_point(|s| s.offset + s.length <= range.start);
        let last = self.segments.partition_point(|s| s.offset < range.end);
        &self.segments[first..last.max(first)]
    }
}

/// Whether `term` has the shape of an indexed token
pub fn is_token(term: &str) -> bool {
    (MIN_TOKEN_LEN..=MAX_TOKEN_LEN).contains(&term.len()) && term.bytes().all(is_token_byte)
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Start offset of every line of `content`
///
/// Empty content has no lines. A trailing newline does not open a line.
pub fn line_offsets(content: &[u8]) -> Vec<u64> {
    if content.is_empty() {
        return Vec::new();
    }
    let mut offsets = vec![0];
    for (i, &b) in content.iter().enumerate() {
        if b == b'\n' && i + 1 < content.len() {
            offsets.push((i + 1) as u64);
        }
    }
    offsets
}

/// Zero-based line holding byte `offset` in a line offset table
pub fn line_of(line_offsets: &[u64], offset: u64) -> u64 {
    line_offsets.partition_point(|&o| o <= offset).saturating_sub(1) as u64
}

/// Byte range of the inclusive lines `start..=end` in a line offset table
pub fn line_range(line_offsets: &[u64], total_len: u64, start: u64, end: u64) -> Result<Range<u64>> {
    let count = line_offsets.len() as u64;
    if start > end {
        return Err(Error::validation(format!(
            "start line {} is after end line {}",
            start, end
        )));
    }
    if start >= count {
        return Err(Error::validation(format!(
            "start line {} is out of range, content has {} lines",
            start, count
        )));
    }
    let end = end.min(count - 1);
    let from = line_offsets[start as usize];
    let to = line_offsets
        .get(end as usize + 1)
        .copied()
        .unwrap_or(total_len);
    Ok(from..to)
}

/// Byte offsets of `term` in `content`, at most `max_results`
///
/// Token-shaped terms match whole tokens only, anything else matches as a
/// plain substring.
pub fn scan(content: &[u8], term: &str, max_results: usize) -> Vec<u64> {
    let needle = term.as_bytes();
    if needle.is_empty() || needle.len() > content.len() || max_results == 0 {
        return Vec::new();
    }
    let whole_token = is_token(term);

    let mut matches = Vec::new();
    for start in 0..=content.len() - needle.len() {
        if &content[start..start + needle.len()] != needle {
            continue;
        }
        if whole_token {
            let before = start.checked_sub(1).map(|i| content[i]);
            let after = content.get(start + needle.len()).copied();
            if before.is_some_and(is_token_byte) || after.is_some_and(is_token_byte) {
                continue;
            }
        }
        matches.push(start as u64);
        if matches.len() == max_results {
            break;
        }
    }
    matches
}

fn build_tokens(
    content: &[u8],
    config: &IndexConfig,
) -> (BTreeMap<String, Vec<u64>>, bool, BTreeSet<String>) {
    let mut tokens: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    let mut saturated = BTreeSet::new();
    let mut truncated = false;

    let mut i = 0;
    while i < content.len() {
        if !is_token_byte(content[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < content.len() && is_token_byte(content[i]) {
            i += 1;
        }
        let len = i - start;
        if !(MIN_TOKEN_LEN..=MAX_TOKEN_LEN).contains(&len) {
            continue;
        }

        let token = String::from_utf8_lossy(&content[start..i]);
        if let Some(positions) = tokens.get_mut(token.as_ref()) {
            if positions.len() < config.max_positions {
                positions.push(start as u64);
            } else {
                saturated.insert(token.into_owned());
            }
        } else if tokens.len() < config.max_tokens {
            tokens.insert(token.into_owned(), vec![start as u64]);
        } else {
            truncated = true;
        }
    }

    (tokens, truncated, saturated)
}

/// Iterate `(line, offset, text)` over valid UTF-8 lines
fn lines<'a>(
    content: &'a [u8],
    line_offsets: &'a [u64],
) -> impl Iterator<Item = (u64, u64, &'a str)> + 'a {
    line_offsets.iter().enumerate().filter_map(move |(line, &start)| {
        let end = line_offsets
            .get(line + 1)
            .map_or(content.len(), |&next| next as usize);
        std::str::from_utf8(&content[start as usize..end])
            .ok()
            .map(|text| (line as u64, start, text.trim_end_matches(['\n', '\r'])))
    })
}

fn code_landmarks(content: &[u8], line_offsets: &[u64]) -> Vec<Landmark> {
    let mut landmarks = Vec::new();
    for (line, start, text) in lines(content, line_offsets) {
        let trimmed = text.trim_start();
        let indent = (text.len() - trimmed.len()) as u64;

        let mut rest = trimmed;
        while let Some(prefix) = CODE_PREFIXES.iter().find(|p| rest.starts_with(*p)) {
            rest = &rest[prefix.len()..];
        }

        for (keyword, kind) in CODE_KEYWORDS {
            let Some(after) = rest.strip_prefix(keyword) else {
                continue;
            };
            let name: String = after
                .trim_start()
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if !name.is_empty() {
                landmarks.push(Landmark {
                    kind,
                    name,
                    line,
                    offset: start + indent,
                });
            }
            break;
        }
    }
    landmarks
}

fn markup_landmarks(content: &[u8], line_offsets: &[u64]) -> Vec<Landmark> {
    let mut seen = HashSet::new();
    let mut landmarks = Vec::new();

    for (i, window) in content.windows(2).enumerate() {
        if window[0] != b'<' || !window[1].is_ascii_alphabetic() {
            continue;
        }
        let name: String = content[i + 1..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-' || **b == b':')
            .map(|&b| char::from(b))
            .collect();
        if seen.insert(name.clone()) {
            landmarks.push(Landmark {
                kind: LandmarkKind::Tag,
                name,
                line: line_of(line_offsets, i as u64),
                offset: i as u64,
            });
        }
    }
    landmarks
}

fn heading_landmarks(content: &[u8], line_offsets: &[u64]) -> Vec<Landmark> {
    lines(content, line_offsets)
        .filter_map(|(line, start, text)| {
            let level = text.bytes().take_while(|&b| b == b'#').count();
            if !(1..=6).contains(&level) || !text[level..].starts_with(' ') {
                return None;
            }
            let name = text[level..].trim();
            (!name.is_empty()).then(|| Landmark {
                kind: LandmarkKind::Heading,
                name: name.to_string(),
                line,
                offset: start,
            })
        })
        .collect()
}
