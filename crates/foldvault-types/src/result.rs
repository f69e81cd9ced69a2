//! Result type alias for FoldVault operations

use crate::Error;

/// Result type alias for FoldVault operations
pub type Result<T> = std::result::Result<T, Error>;
