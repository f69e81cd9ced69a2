//! Collaborator traits consumed by the vault engine
//!
//! The engine never talks to a concrete backend. Durable storage and access
//! control are supplied by the embedding application through these traits.

use crate::{RecordId, Result};

#[cfg(feature = "async")]
use async_trait::async_trait;

/// Byte-oriented durable store
///
/// Keys are opaque strings chosen by the engine. Implementations must make a
/// completed `put` visible to every later `get`.
#[cfg(feature = "async")]
#[async_trait]
pub trait VaultStorage: Send + Sync {
    /// Fetch the bytes stored under `key`, or `None` when absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `bytes` under `key`, replacing any previous value
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Remove `key`; returns whether something was removed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Every key currently stored
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Access check invoked before every retrieval path
#[cfg(feature = "async")]
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Decide whether `principal` may read `record_id`
    async fn authorize(&self, principal: &str, record_id: &RecordId) -> Result<bool>;

    /// Notification that `owner_id` has just created `record_id`
    async fn record_created(&self, _owner_id: &str, _record_id: &RecordId) -> Result<()> {
        Ok(())
    }
}

/// Receives records that failed integrity verification
pub trait QuarantineSink: Send + Sync {
    /// Flag a record for quarantine
    fn quarantine(&self, record_id: &RecordId, reason: &str);
}
