//! Indexed vault storage engine for FoldVault
//!
//! This crate ties the folding pipeline to durable storage. Content is folded,
//! indexed and persisted as a self-describing record; retrieval verifies the
//! full SHA-256 of the original before any byte is returned.
//!
//! # Features
//!
//! - **Vault records**: versioned binary records that fail closed on unknown formats
//! - **Content index**: line offsets, a bounded token map, landmarks and checksummed segments
//! - **Range and term queries**: answered from the index when it can, by verified decode otherwise
//! - **Collaborators**: pluggable storage, authorization and quarantine
//! - **Statistics**: sizes, ratios and strategy usage per owner
//!
//! # Examples
//!
//! ```rust
//! use foldvault_config::Config;
//! use foldvault_engine::{StoreRequest, VaultEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = VaultEngine::with_config(Config::default()).await?;
//! let receipt = engine
//!     .store(StoreRequest::new("alice", "notes", "todo.txt", b"buy milk\n".to_vec()))
//!     .await?;
//!
//! let retrieved = engine.retrieve("alice", &receipt.record_id).await?;
//! assert_eq!(retrieved.content, b"buy milk\n");
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod engine;
pub mod index;
pub mod locks;
pub mod record;
pub mod request;
pub mod stats;
pub mod storage;

pub use auth::{AccessList, AllowAll, QuarantineList};
pub use engine::{EngineBuilder, VaultEngine};
pub use index::{ContentIndex, Landmark, LandmarkKind, Segment};
pub use record::{RecordMetadata, VaultRecord, FORMAT_VERSION, MAGIC};
pub use request::{
    RangeContent, Retrieved, SearchMatch, SearchResult, StoreReceipt, StoreRequest, MAX_NAME_LEN,
};
pub use stats::{Catalog, VaultStats};
pub use storage::{FsStorage, MemoryStorage};
