//! Pluggable content repositories.
//!
//! Every backend implements the same five-operation [`ContentRepository`]
//! contract, so callers pick one at startup and never branch on it again.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │           ContentRepository              │
//! │  save · get · list · delete · exists     │
//! └───────────────┬──────────────────────────┘
//!                 │
//!      ┌──────────┼─────────────────┐
//!      │          │                 │
//! ┌────▼─────┐ ┌──▼──────────┐ ┌────▼─────────────────┐
//! │ InMemory │ │ Filesystem  │ │ ObjectStore          │
//! │ volatile │ │ {id}.json   │ │ BlobBackend          │
//! │          │ │ per record  │ │ gcp · aws · azure    │
//! └──────────┘ └─────────────┘ └──────────────────────┘
//! ```

pub mod cloud;
pub mod factory;
pub mod filesystem;
pub mod health;
pub mod memory;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::{ContentId, ContentRecord};
use crate::error::{StoreError, StoreResult};

// Re-export main types
pub use cloud::{BlobBackend, CloudProvider, CloudSettings, ObjectStoreBlobs, ObjectStoreRepository};
pub use factory::{create_repository, StorageKind, StorageSettings, DEFAULT_CONTENT_DIR};
pub use filesystem::FilesystemRepository;
pub use health::{HealthReport, HealthStatus};
pub use memory::InMemoryRepository;

/// Content type recorded on stored blobs
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Storage contract shared by every backend.
///
/// Missing content is never an error: `get` yields `None`, `exists` yields
/// `false` and `delete` succeeds. Any other failure is propagated untouched;
/// repositories do not retry.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Short backend name (`memory`, `filesystem`, `gcp`, ...)
    fn kind(&self) -> &str;

    /// Store `record` under `id`, replacing whatever was there
    async fn save(&self, id: &ContentId, record: &ContentRecord) -> StoreResult<()>;

    /// Load the record stored under `id`
    async fn get(&self, id: &ContentId) -> StoreResult<Option<ContentRecord>>;

    /// All records, newest `createdAt` first
    async fn list(&self) -> StoreResult<Vec<ContentRecord>>;

    /// Remove the record stored under `id`
    async fn delete(&self, id: &ContentId) -> StoreResult<()>;

    /// Whether a record is stored under `id`
    async fn exists(&self, id: &ContentId) -> StoreResult<bool>;
}

/// Checks shared by every `save` implementation
pub(crate) fn check_save(id: &ContentId, record: &ContentRecord) -> StoreResult<()> {
    record.validate()?;

    if &record.id != id {
        warn!(key = %id, record_id = %record.id, "Saving record under a different id");
    }

    Ok(())
}

/// Serialize a record the way it is persisted (2-space indented JSON)
pub(crate) fn encode_record(record: &ContentRecord) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(record)?)
}

/// Parse a persisted record, attributing failures to `key`
pub(crate) fn decode_record(key: &str, bytes: &[u8]) -> StoreResult<ContentRecord> {
    serde_json::from_slice(bytes).map_err(|source| StoreError::Malformed {
        key: key.to_string(),
        source,
    })
}
