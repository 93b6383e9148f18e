//! Blob backend seam for the object-store repository.
//!
//! Provider bindings only move bytes by key; JSON handling, naming and
//! ordering live in [`super::ObjectStoreRepository`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};

use crate::error::StoreResult;

/// Key/value blob storage as seen by the repository.
///
/// "Not found" is folded into the return values: `get` yields `None`,
/// `head` yields `false` and `delete` of a missing key succeeds.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Provider name (`gcp`, `aws`, `azure`, `memory`)
    fn provider(&self) -> &str;

    /// Store `body` under `key`, replacing any existing blob
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> StoreResult<()>;

    /// Fetch the blob stored under `key`
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Whether a blob is stored under `key`
    async fn head(&self, key: &str) -> StoreResult<bool>;

    /// Every key in the bucket, across all result pages
    async fn list_keys(&self) -> StoreResult<Vec<String>>;

    /// Remove the blob stored under `key`
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// [`BlobBackend`] over an `object_store` client (S3, GCS, Azure, in-memory)
#[derive(Debug, Clone)]
pub struct ObjectStoreBlobs {
    provider: String,
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreBlobs {
    /// Wrap an already configured client
    pub fn new(provider: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            provider: provider.into(),
            store,
        }
    }

    /// Process-local bucket, handy for tests and dry runs
    pub fn in_memory() -> Self {
        Self::new("memory", Arc::new(InMemory::new()))
    }

    /// The underlying client
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }
}

#[async_trait]
impl BlobBackend for ObjectStoreBlobs {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> StoreResult<()> {
        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );

        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&ObjectPath::from(key), PutPayload::from(body), options)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let result = match self.store.get(&ObjectPath::from(key)).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // The object can disappear between the response head and its body
        match result.bytes().await {
            Ok(bytes) => Ok(Some(bytes.to_vec())),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn head(&self, key: &str) -> StoreResult<bool> {
        match self.store.head(&ObjectPath::from(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_keys(&self) -> StoreResult<Vec<String>> {
        let keys: Vec<String> = self
            .store
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await?;
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match self.store.delete(&ObjectPath::from(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
