//! Authorizers and quarantine sinks

use async_trait::async_trait;
use foldvault_types::{Authorizer, QuarantineSink, RecordId, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Grants every request, for single-user local vaults
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _principal: &str, _record_id: &RecordId) -> Result<bool> {
        Ok(true)
    }
}

/// In-memory grant table
///
/// Owners are granted access when their record is created. Further
/// principals are added with [`AccessList::grant`].
#[derive(Debug, Default)]
pub struct AccessList {
    grants: RwLock<HashMap<RecordId, HashSet<String>>>,
}

impl AccessList {
    /// Create an empty grant table
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `principal` to read `record_id`
    pub async fn grant(&self, principal: &str, record_id: RecordId) {
        self.grants
            .write()
            .await
            .entry(record_id)
            .or_default()
            .insert(principal.to_string());
    }

    /// Withdraw a grant; returns whether one existed
    pub async fn revoke(&self, principal: &str, record_id: &RecordId) -> bool {
        let mut grants = self.grants.write().await;
        let Some(principals) = grants.get_mut(record_id) else {
            return false;
        };
        let removed = principals.remove(principal);
        if principals.is_empty() {
            grants.remove(record_id);
        }
        removed
    }
}

#[async_trait]
impl Authorizer for AccessList {
    async fn authorize(&self, principal: &str, record_id: &RecordId) -> Result<bool> {
        let allowed = self
            .grants
            .read()
            .await
            .get(record_id)
            .is_some_and(|principals| principals.contains(principal));
        debug!("Access for {} on {}: {}", principal, record_id, allowed);
        Ok(allowed)
    }

    async fn record_created(&self, owner_id: &str, record_id: &RecordId) -> Result<()> {
        self.grant(owner_id, *record_id).await;
        Ok(())
    }
}

/// Collects records that failed verification
#[derive(Debug, Default)]
pub struct QuarantineList {
    flagged: Mutex<Vec<(RecordId, String)>>,
}

impl QuarantineList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Records flagged so far, oldest first
    pub fn flagged(&self) -> Vec<(RecordId, String)> {
        self.flagged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether `record_id` has been flagged
    pub fn contains(&self, record_id: &RecordId) -> bool {
        self.flagged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(id, _)| id == record_id)
    }
}

impl QuarantineSink for QuarantineList {
    fn quarantine(&self, record_id: &RecordId, reason: &str) {
        warn!("Record {} quarantined: {}", record_id, reason);
        self.flagged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((*record_id, reason.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allow_all() {
        assert!(AllowAll.authorize("anyone", &RecordId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_access_list_grants_owner_on_create() {
        let acl = AccessList::new();
        let id = RecordId::new();
        assert!(!acl.authorize("alice", &id).await.unwrap());

        acl.record_created("alice", &id).await.unwrap();
        assert!(acl.authorize("alice", &id).await.unwrap());
        assert!(!acl.authorize("bob", &id).await.unwrap());

        acl.grant("bob", id).await;
        assert!(acl.authorize("bob", &id).await.unwrap());
        assert!(acl.revoke("bob", &id).await);
        assert!(!acl.revoke("bob", &id).await);
        assert!(!acl.authorize("bob", &id).await.unwrap());
    }

    #[test]
    fn test_quarantine_list() {
        let list = QuarantineList::new();
        let id = RecordId::new();
        list.quarantine(&id, "hash mismatch");
        assert!(list.contains(&id));
        assert_eq!(list.flagged()[0].1, "hash mismatch");
    }
}
