//! Requests accepted and results returned by the vault engine

use crate::record::RecordMetadata;
use foldvault_types::{ContentClass, Error, RecordId, Result};
use serde::{Deserialize, Serialize};

/// Longest accepted record name in bytes
pub const MAX_NAME_LEN: usize = 255;

/// Content to store with its ownership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRequest {
    /// Owning principal
    pub owner_id: String,
    /// Collection the record belongs to
    pub collection_id: String,
    /// Display name
    pub name: String,
    /// Bytes to store
    pub content: Vec<u8>,
    /// Caller's idea of the content class, overriding detection
    pub content_class_hint: Option<ContentClass>,
}

impl StoreRequest {
    /// Create a request without a class hint
    pub fn new<O, C, N>(owner_id: O, collection_id: C, name: N, content: Vec<u8>) -> Self
    where
        O: Into<String>,
        C: Into<String>,
        N: Into<String>,
    {
        Self {
            owner_id: owner_id.into(),
            collection_id: collection_id.into(),
            name: name.into(),
            content,
            content_class_hint: None,
        }
    }

    /// Set the content class hint
    pub fn with_class_hint(mut self, class: ContentClass) -> Self {
        self.content_class_hint = Some(class);
        self
    }

    /// Check the request against `max_content_size`
    pub fn validate(&self, max_content_size: usize) -> Result<()> {
        for (field, value) in [
            ("owner_id", &self.owner_id),
            ("collection_id", &self.collection_id),
            ("name", &self.name),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(format!("{} must not be empty", field)));
            }
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(Error::validation(format!(
                "name is {} bytes, the limit is {}",
                self.name.len(),
                MAX_NAME_LEN
            )));
        }
        if self.content.len() > max_content_size {
            return Err(Error::validation(format!(
                "content is {} bytes, the limit is {}",
                self.content.len(),
                max_content_size
            )));
        }
        Ok(())
    }
}

/// Outcome of a successful store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreReceipt {
    /// Identifier of the new record
    pub record_id: RecordId,
    /// Size of the original content
    pub original_size: u64,
    /// Size of the stored payload
    pub final_size: u64,
    /// `final_size / original_size`
    pub ratio: f64,
    /// Reporting-only quality against the class target
    pub quality_score: f64,
    /// Detected or hinted content class
    pub content_class: ContentClass,
    /// Strategy tags in application order
    pub strategies: Vec<String>,
    /// Human-readable pipeline summary
    pub pipeline_trace_summary: String,
}

/// Verified content with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    /// Original bytes
    pub content: Vec<u8>,
    /// Always true; failed verification is an error
    pub integrity_ok: bool,
    /// Record metadata after access bookkeeping
    pub metadata: RecordMetadata,
}

/// Slice of a record covering whole lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeContent {
    /// Bytes of the requested lines
    pub content: Vec<u8>,
    /// First returned line
    pub start_line: u64,
    /// Last returned line after clamping
    pub end_line: u64,
    /// Byte offset of `content` in the original
    pub offset: u64,
    /// Served from checksummed segments without a full decode
    pub from_segments: bool,
}

/// One occurrence of a search term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Byte offset in the original content
    pub offset: u64,
    /// Zero-based line of the match
    pub line: u64,
}

/// Matches of a term query
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matches in content order
    pub matches: Vec<SearchMatch>,
    /// Answered from the token map without decoding
    pub used_index: bool,
}

impl SearchResult {
    /// Number of matches
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether nothing matched
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request() -> StoreRequest {
        StoreRequest::new("alice", "notes", "todo.txt", b"buy milk".to_vec())
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate(1024).is_ok());
        assert_eq!(
            request().with_class_hint(ContentClass::Text).content_class_hint,
            Some(ContentClass::Text)
        );
    }

    #[rstest]
    #[case::empty_owner(StoreRequest { owner_id: String::new(), ..request() })]
    #[case::blank_collection(StoreRequest { collection_id: "  ".to_string(), ..request() })]
    #[case::empty_name(StoreRequest { name: String::new(), ..request() })]
    #[case::long_name(StoreRequest { name: "n".repeat(256), ..request() })]
    #[case::too_large(StoreRequest { content: vec![0; 2048], ..request() })]
    fn test_invalid_request(#[case] request: StoreRequest) {
        assert!(matches!(
            request.validate(1024),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_name_limit_is_inclusive() {
        let request = StoreRequest {
            name: "n".repeat(MAX_NAME_LEN),
            ..request()
        };
        assert!(request.validate(1024).is_ok());
    }
}
