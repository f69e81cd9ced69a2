//! Core data types for FoldVault
//!
//! This module provides the identifiers and closed enumerations shared by the
//! compression pipeline and the vault engine.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Unique identifier for a vault record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecordId(uuid::Uuid);

impl RecordId {
    /// Generate a fresh random record id
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Storage key under which the record is persisted
    pub fn storage_key(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| Error::validation(format!("Invalid record id '{}': {}", s, e)))
    }
}

/// Closed set of compression strategies known to this build
///
/// The string tag returned by [`StrategyId::as_str`] is what gets persisted in
/// pipeline traces, so tags must never be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StrategyId {
    /// Identity transform, the mandatory fallback
    Passthrough,
    /// Run-length tokens for long symbol runs
    #[cfg_attr(feature = "serde", serde(rename = "rle"))]
    RunLength,
    /// Sliding-window back-references
    Dictionary,
    /// Prefix code built from the content's own frequency table
    Entropy,
    /// General-purpose deflate stream
    Deflate,
}

impl StrategyId {
    /// All strategies, in registry order
    pub fn all() -> &'static [StrategyId] {
        &[
            StrategyId::Passthrough,
            StrategyId::RunLength,
            StrategyId::Dictionary,
            StrategyId::Entropy,
            StrategyId::Deflate,
        ]
    }

    /// Stable persisted tag
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Passthrough => "passthrough",
            StrategyId::RunLength => "rle",
            StrategyId::Dictionary => "dictionary",
            StrategyId::Entropy => "entropy",
            StrategyId::Deflate => "deflate",
        }
    }

    /// Whether this is the identity transform
    pub fn is_passthrough(&self) -> bool {
        matches!(self, StrategyId::Passthrough)
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passthrough" => Ok(StrategyId::Passthrough),
            "rle" => Ok(StrategyId::RunLength),
            "dictionary" => Ok(StrategyId::Dictionary),
            "entropy" => Ok(StrategyId::Entropy),
            "deflate" => Ok(StrategyId::Deflate),
            other => Err(Error::unsupported_strategy(other)),
        }
    }
}

/// Coarse content classification used for quality targets and index landmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContentClass {
    /// Source code
    Code,
    /// HTML/XML-like markup
    Markup,
    /// JSON documents
    Json,
    /// Prose and plain text
    Text,
    /// Non-textual bytes
    Binary,
    /// Empty or unclassifiable content
    #[default]
    Unknown,
}

impl ContentClass {
    /// Compression ratio considered a good result for this class
    ///
    /// Only used to compute reporting scores.
    pub fn target_ratio(&self) -> f64 {
        match self {
            ContentClass::Code => 0.35,
            ContentClass::Markup => 0.35,
            ContentClass::Json => 0.30,
            ContentClass::Text => 0.45,
            ContentClass::Binary => 0.85,
            ContentClass::Unknown => 0.60,
        }
    }

    /// Whether the class is line-oriented text
    pub fn is_textual(&self) -> bool {
        !matches!(self, ContentClass::Binary | ContentClass::Unknown)
    }
}

impl FromStr for ContentClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "code" => Ok(ContentClass::Code),
            "markup" | "html" | "xml" => Ok(ContentClass::Markup),
            "json" => Ok(ContentClass::Json),
            "text" => Ok(ContentClass::Text),
            "binary" => Ok(ContentClass::Binary),
            "unknown" => Ok(ContentClass::Unknown),
            other => Err(Error::validation(format!("Unknown content class '{}'", other))),
        }
    }
}

impl fmt::Display for ContentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentClass::Code => "code",
            ContentClass::Markup => "markup",
            ContentClass::Json => "json",
            ContentClass::Text => "text",
            ContentClass::Binary => "binary",
            ContentClass::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StrategyId::Passthrough)]
    #[case(StrategyId::RunLength)]
    #[case(StrategyId::Dictionary)]
    #[case(StrategyId::Entropy)]
    #[case(StrategyId::Deflate)]
    fn test_strategy_tag_parses_back(#[case] id: StrategyId) {
        assert_eq!(id.as_str().parse::<StrategyId>().unwrap(), id);
    }

    #[test]
    fn test_unknown_strategy_tag_is_unsupported() {
        let err = "quantum".parse::<StrategyId>().unwrap_err();
        assert_eq!(err, Error::unsupported_strategy("quantum"));
    }

    #[test]
    fn test_record_id_parsing() {
        let id = RecordId::new();
        let parsed: RecordId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_content_class_targets() {
        assert!(ContentClass::Json.target_ratio() < ContentClass::Binary.target_ratio());
        assert!(ContentClass::Code.is_textual());
        assert!(!ContentClass::Binary.is_textual());
        assert_eq!("HTML".parse::<ContentClass>().unwrap(), ContentClass::Markup);
    }
}
