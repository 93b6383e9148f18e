//! Volatile in-process repository.
//!
//! Lost on restart; used as the default backend and in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{check_save, ContentRepository};
use crate::domain::{sort_newest_first, ContentId, ContentRecord};
use crate::error::StoreResult;

/// Repository backed by a lock-guarded map
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    records: RwLock<HashMap<ContentId, ContentRecord>>,
}

impl InMemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the repository is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    fn kind(&self) -> &str {
        "memory"
    }

    async fn save(&self, id: &ContentId, record: &ContentRecord) -> StoreResult<()> {
        check_save(id, record)?;
        self.records.write().await.insert(id.clone(), record.clone());
        debug!(%id, "Saved record in memory");
        Ok(())
    }

    async fn get(&self, id: &ContentId) -> StoreResult<Option<ContentRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<ContentRecord>> {
        let mut records: Vec<ContentRecord> = self.records.read().await.values().cloned().collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: &ContentId) -> StoreResult<()> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn exists(&self, id: &ContentId) -> StoreResult<bool> {
        Ok(self.records.read().await.contains_key(id))
    }
}
