//! Persisted vault record format
//!
//! A stored record is a 6-byte header followed by a bincode body:
//!
//! ```text
//! +--------+----------------+---------------------------+
//! | "FVLT" | version u16 LE | bincode(VaultRecord)      |
//! +--------+----------------+---------------------------+
//! ```
//!
//! The header version is checked before the body is touched, so a record
//! written by a newer build fails closed instead of being decoded on a guess.

use crate::index::ContentIndex;
use chrono::{DateTime, Utc};
use foldvault_compression::PipelineTrace;
use foldvault_types::{ContentClass, Error, RecordId, Result};
use serde::{Deserialize, Serialize};

/// Leading bytes of every stored record
pub const MAGIC: [u8; 4] = *b"FVLT";

/// Format version written by this build
pub const FORMAT_VERSION: u16 = 1;

/// Magic plus version
pub const HEADER_LEN: usize = MAGIC.len() + 2;

/// The persisted unit for one stored item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// Record format version
    pub format_version: u16,
    /// Record identifier
    pub record_id: RecordId,
    /// Owning principal
    pub owner_id: String,
    /// Collection the record belongs to
    pub collection_id: String,
    /// Display name
    pub name: String,
    /// Size of the original content
    pub original_size: u64,
    /// Size of the stored payload
    pub final_size: u64,
    /// Lower-case hex SHA-256 of the original content
    pub integrity_hash: String,
    /// Stages applied to produce the payload
    pub pipeline_trace: PipelineTrace,
    /// Folded bytes
    pub payload: Vec<u8>,
    /// Index over the original content
    pub content_index: Option<ContentIndex>,
    /// Class of the original content
    pub content_class: ContentClass,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Number of verified full retrievals
    pub access_count: u64,
    /// Time of the last verified full retrieval
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl VaultRecord {
    /// `final_size / original_size`, 1.0 for empty content
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            1.0
        } else {
            self.final_size as f64 / self.original_size as f64
        }
    }

    /// Serialize with header
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| Error::serialization(format!("Failed to encode record: {}", e)))?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&self.format_version.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Read the header version without decoding the body
    pub fn peek_version(bytes: &[u8]) -> Result<u16> {
        if bytes.len() < HEADER_LEN || bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::serialization("Not a vault record: bad magic"));
        }
        Ok(u16::from_le_bytes([bytes[4], bytes[5]]))
    }

    /// Parse a stored record
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let version = Self::peek_version(bytes)?;
        if version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion { version });
        }

        let body = &bytes[HEADER_LEN..];
        let (record, consumed): (Self, usize) =
            bincode::serde::decode_from_slice(body, bincode::config::standard())
                .map_err(|e| Error::serialization(format!("Failed to decode record: {}", e)))?;

        if consumed != body.len() {
            return Err(Error::serialization(format!(
                "{} trailing bytes after record body",
                body.len() - consumed
            )));
        }
        if record.format_version != version {
            return Err(Error::serialization(format!(
                "header version {} disagrees with body version {}",
                version, record.format_version
            )));
        }
        Ok(record)
    }

    /// Metadata view without the payload
    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            record_id: self.record_id,
            owner_id: self.owner_id.clone(),
            collection_id: self.collection_id.clone(),
            name: self.name.clone(),
            original_size: self.original_size,
            final_size: self.final_size,
            ratio: self.ratio(),
            integrity_hash: self.integrity_hash.clone(),
            content_class: self.content_class,
            strategies: self
                .pipeline_trace
                .strategy_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
            pipeline_trace_summary: self.pipeline_trace.summary(),
            line_count: self.content_index.as_ref().map(ContentIndex::line_count),
            landmarks: self
                .content_index
                .as_ref()
                .map_or(0, |index| index.landmarks.len()),
            created_at: self.created_at,
            access_count: self.access_count,
            last_accessed_at: self.last_accessed_at,
        }
    }
}

/// Everything about a record except its content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Record identifier
    pub record_id: RecordId,
    /// Owning principal
    pub owner_id: String,
    /// Collection the record belongs to
    pub collection_id: String,
    /// Display name
    pub name: String,
    /// Size of the original content
    pub original_size: u64,
    /// Size of the stored payload
    pub final_size: u64,
    /// `final_size / original_size`
    pub ratio: f64,
    /// Hex SHA-256 of the original content
    pub integrity_hash: String,
    /// Class of the original content
    pub content_class: ContentClass,
    /// Strategy tags in application order
    pub strategies: Vec<String>,
    /// Human-readable pipeline summary
    pub pipeline_trace_summary: String,
    /// Line count when the record is indexed
    pub line_count: Option<u64>,
    /// Number of indexed landmarks
    pub landmarks: usize,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Number of verified full retrievals
    pub access_count: u64,
    /// Time of the last verified full retrieval
    pub last_accessed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use foldvault_compression::FoldingPipeline;
    use foldvault_types::IndexConfig;

    fn sample_record() -> VaultRecord {
        let content = b"fn main() {\n    println!(\"vault\");\n}\n".repeat(20);
        let outcome = FoldingPipeline::default().fold(&content, None);
        VaultRecord {
            format_version: FORMAT_VERSION,
            record_id: RecordId::new(),
            owner_id: "alice".to_string(),
            collection_id: "notes".to_string(),
            name: "main.rs".to_string(),
            original_size: content.len() as u64,
            final_size: outcome.payload.len() as u64,
            integrity_hash: outcome.integrity_hash,
            pipeline_trace: outcome.trace,
            payload: outcome.payload,
            content_index: Some(ContentIndex::build(
                &content,
                outcome.content_class,
                &IndexConfig::default(),
            )),
            content_class: outcome.content_class,
            created_at: Utc::now(),
            access_count: 3,
            last_accessed_at: None,
        }
    }

    #[test]
    fn test_encode_decode() {
        let record = sample_record();
        let bytes = record.encode().unwrap();
        assert_eq!(&bytes[..4], b"FVLT");
        assert_eq!(VaultRecord::peek_version(&bytes).unwrap(), FORMAT_VERSION);
        assert_eq!(VaultRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_unknown_version_fails_closed() {
        let mut bytes = sample_record().encode().unwrap();
        bytes[4..6].copy_from_slice(&7u16.to_le_bytes());
        assert_eq!(
            VaultRecord::decode(&bytes).unwrap_err(),
            Error::UnsupportedVersion { version: 7 }
        );
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample_record().encode().unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            VaultRecord::decode(&bytes),
            Err(Error::Serialization { .. })
        ));
        assert!(matches!(
            VaultRecord::decode(b"FV"),
            Err(Error::Serialization { .. })
        ));
    }

    #[test]
    fn test_truncated_body() {
        let bytes = sample_record().encode().unwrap();
        assert!(matches!(
            VaultRecord::decode(&bytes[..bytes.len() / 2]),
            Err(Error::Serialization { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = sample_record().encode().unwrap();
        bytes.push(0);
        assert!(matches!(
            VaultRecord::decode(&bytes),
            Err(Error::Serialization { .. })
        ));
    }

    #[test]
    fn test_metadata_view() {
        let record = sample_record();
        let metadata = record.metadata();
        assert_eq!(metadata.record_id, record.record_id);
        assert_eq!(metadata.access_count, 3);
        assert_eq!(metadata.line_count, Some(60));
        assert!(metadata.ratio < 1.0);
        assert_eq!(metadata.strategies.len(), record.pipeline_trace.len());
    }
}
