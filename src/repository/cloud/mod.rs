//! Object-store repository: one JSON blob per record in a bucket.
//!
//! The provider (GCS, S3, Azure Blob) is picked once when the repository is
//! built and hidden behind [`BlobBackend`].

pub mod blob;
pub mod providers;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{check_save, decode_record, encode_record, ContentRepository, JSON_CONTENT_TYPE};
use crate::domain::{sort_newest_first, ContentId, ContentRecord};
use crate::error::{StoreError, StoreResult};

pub use blob::{BlobBackend, ObjectStoreBlobs};
pub use providers::{CloudProvider, CloudSettings, DEFAULT_AWS_REGION};

/// Upper bound on blob downloads in flight during `list`
const MAX_CONCURRENT_FETCHES: usize = 16;

/// Repository storing records as blobs named `{id}.json`
#[derive(Clone)]
pub struct ObjectStoreRepository {
    bucket: String,
    blobs: Arc<dyn BlobBackend>,
}

impl ObjectStoreRepository {
    /// Wrap a blob backend bound to `bucket`
    pub fn new(bucket: impl Into<String>, blobs: Arc<dyn BlobBackend>) -> StoreResult<Self> {
        let bucket = bucket.into();
        if bucket.trim().is_empty() {
            return Err(StoreError::config("BUCKET_NAME is required for cloud storage"));
        }
        Ok(Self { bucket, blobs })
    }

    /// Build the provider client described by `settings`
    pub fn connect(settings: &CloudSettings) -> StoreResult<Self> {
        let bucket = settings.bucket_name()?.to_string();
        let store = settings.provider.build_store(settings)?;
        let blobs = ObjectStoreBlobs::new(settings.provider.as_str(), store);

        info!(
            provider = %settings.provider,
            bucket = %bucket,
            "Connected cloud content repository"
        );
        Self::new(bucket, Arc::new(blobs))
    }

    /// Bucket (or container) holding the records
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl std::fmt::Debug for ObjectStoreRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreRepository")
            .field("bucket", &self.bucket)
            .field("provider", &self.blobs.provider())
            .finish()
    }
}

#[async_trait]
impl ContentRepository for ObjectStoreRepository {
    fn kind(&self) -> &str {
        self.blobs.provider()
    }

    async fn save(&self, id: &ContentId, record: &ContentRecord) -> StoreResult<()> {
        check_save(id, record)?;

        let body = encode_record(record)?;
        self.blobs
            .put(&id.file_name(), body, JSON_CONTENT_TYPE)
            .await?;

        debug!(%id, bucket = %self.bucket, "Uploaded record");
        Ok(())
    }

    async fn get(&self, id: &ContentId) -> StoreResult<Option<ContentRecord>> {
        let key = id.file_name();
        match self.blobs.get(&key).await? {
            Some(bytes) => decode_record(&key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn list(&self) -> StoreResult<Vec<ContentRecord>> {
        let keys = self.blobs.list_keys().await?;
        let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));
        let mut fetches = JoinSet::new();

        for key in keys {
            // Nested keys and foreign objects are not records
            if ContentId::from_file_name(&key).is_none() {
                continue;
            }

            let blobs = Arc::clone(&self.blobs);
            let permits = Arc::clone(&permits);
            fetches.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let body = blobs.get(&key).await;
                (key, body)
            });
        }

        let mut records = Vec::with_capacity(fetches.len());

        // Returning early drops the set, which aborts outstanding fetches
        while let Some(joined) = fetches.join_next().await {
            let (key, body) = joined?;
            match body? {
                Some(bytes) => match decode_record(&key, &bytes) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(key = %key, error = %e, "Skipping unreadable record"),
                },
                None => debug!(key = %key, "Record vanished while listing"),
            }
        }

        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: &ContentId) -> StoreResult<()> {
        self.blobs.delete(&id.file_name()).await?;
        debug!(%id, bucket = %self.bucket, "Deleted record");
        Ok(())
    }

    async fn exists(&self, id: &ContentId) -> StoreResult<bool> {
        self.blobs.head(&id.file_name()).await
    }
}
