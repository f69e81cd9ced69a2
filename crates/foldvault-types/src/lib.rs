//! Core type system and error handling for FoldVault
//!
//! This crate provides the foundational types, error handling, and shared data structures
//! used throughout the FoldVault workspace. It includes:
//!
//! - **Error handling**: The engine's error taxonomy with severity levels
//! - **Core types**: Record identifiers, the closed strategy set, content classes
//! - **Traits**: Collaborator interfaces for durable storage and authorization
//! - **Configuration**: Per-component configuration with validation
//!
//! # Features
//!
//! - `std` (default): Enable standard library features
//! - `async`: Enable async collaborator traits
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use foldvault_types::{Error, Result, StrategyId};
//!
//! fn parse_stage(tag: &str) -> Result<StrategyId> {
//!     tag.parse()
//! }
//!
//! assert_eq!(parse_stage("rle").unwrap(), StrategyId::RunLength);
//! assert!(matches!(parse_stage("fractal"), Err(Error::UnsupportedStrategy { .. })));
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{CodecConfig, IndexConfig, MemoryConfig, PipelineConfig, SelectorConfig};
pub use error::{Error, ErrorKind, ErrorSeverity};
pub use result::Result;
pub use traits::*;
pub use types::*;
