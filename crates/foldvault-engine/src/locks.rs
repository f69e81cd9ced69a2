//! Per-record serialization of read-modify-write bookkeeping

use foldvault_types::RecordId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per record id
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<RecordId, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    /// Create an empty lock map
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `record_id`
    pub async fn acquire(&self, record_id: RecordId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() >= PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(record_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop the lock of a deleted record
    pub fn forget(&self, record_id: &RecordId) {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(record_id);
    }

    /// Number of tracked records
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no record is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_record_is_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let id = RecordId::new();

        let guard = locks.acquire(id).await;
        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());
        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_records_do_not_block() {
        let locks = KeyedLocks::new();
        let _first = locks.acquire(RecordId::new()).await;
        let _second = locks.acquire(RecordId::new()).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_forget() {
        let locks = KeyedLocks::new();
        let id = RecordId::new();
        drop(locks.acquire(id).await);
        locks.forget(&id);
        assert!(locks.is_empty());
    }
}
