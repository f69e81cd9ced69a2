//! JSON output structures for the FoldVault CLI

use foldvault_engine::{RangeContent, RecordMetadata, SearchResult, VaultStats};
use serde::{Deserialize, Serialize};

/// Envelope printed for every command when `--json` is set
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandOutput<T> {
    /// Operation metadata
    pub metadata: OperationMetadata,
    /// Command specific payload
    pub data: T,
}

/// Operation metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// FoldVault version
    pub version: String,
    /// Operation type
    pub operation: String,
    /// Timestamp when the output was produced
    pub timestamp: String,
    /// Vault directory the command ran against
    pub vault_dir: String,
}

impl<T: Serialize> CommandOutput<T> {
    /// Wrap `data` for `operation`
    pub fn new(operation: &str, vault_dir: &std::path::Path, data: T) -> Self {
        Self {
            metadata: OperationMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                operation: operation.to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                vault_dir: vault_dir.display().to_string(),
            },
            data,
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Result of `get`
#[derive(Debug, Serialize, Deserialize)]
pub struct GetJson {
    /// Record metadata after the access was counted
    pub record: RecordMetadata,
    /// Where the content was written, if anywhere
    pub output_path: Option<String>,
    /// Content as text when it is valid UTF-8 and no output file was given
    pub content: Option<String>,
}

/// Result of `range`
#[derive(Debug, Serialize, Deserialize)]
pub struct RangeJson {
    /// First line returned
    pub start_line: u64,
    /// Last line returned
    pub end_line: u64,
    /// Byte offset of the first line
    pub offset: u64,
    /// Number of bytes returned
    pub length: usize,
    /// Whether only checksummed segments were read
    pub from_segments: bool,
    /// Lossy UTF-8 rendering of the returned bytes
    pub content: String,
}

impl From<&RangeContent> for RangeJson {
    fn from(range: &RangeContent) -> Self {
        Self {
            start_line: range.start_line,
            end_line: range.end_line,
            offset: range.offset,
            length: range.content.len(),
            from_segments: range.from_segments,
            content: String::from_utf8_lossy(&range.content).into_owned(),
        }
    }
}

/// Result of `search`
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchJson {
    /// Term that was searched
    pub term: String,
    /// Matches and whether the index answered
    #[serde(flatten)]
    pub result: SearchResult,
}

/// Result of `stats`
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsJson {
    /// Owner filter, if any
    pub owner: Option<String>,
    /// Bytes saved across the selected records
    pub space_saved: u64,
    /// Aggregated statistics
    #[serde(flatten)]
    pub stats: VaultStats,
}

impl StatsJson {
    /// Build from engine statistics
    pub fn new(owner: Option<String>, stats: VaultStats) -> Self {
        Self {
            owner,
            space_saved: stats.space_saved(),
            stats,
        }
    }
}

/// Result of `rm`
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteJson {
    /// Removed record
    pub record_id: String,
    /// Always true; failures surface as errors
    pub deleted: bool,
}
