//! Selects and builds the repository named by configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::cloud::{CloudProvider, CloudSettings, ObjectStoreRepository};
use super::{ContentRepository, FilesystemRepository, InMemoryRepository};
use crate::error::{StoreError, StoreResult};

/// Default filesystem root, relative to the working directory
pub const DEFAULT_CONTENT_DIR: &str = "./h5p/content";

/// Which backend to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageKind {
    #[default]
    Memory,
    Filesystem,
    /// Object store; `None` defers to the configured provider
    Cloud(Option<CloudProvider>),
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Filesystem => "filesystem",
            Self::Cloud(None) => "cloud",
            Self::Cloud(Some(provider)) => provider.as_str(),
        }
    }
}

impl FromStr for StorageKind {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "filesystem" | "file" => Ok(Self::Filesystem),
            "cloud" => Ok(Self::Cloud(None)),
            other => other.parse::<CloudProvider>().map(|p| Self::Cloud(Some(p))).map_err(|_| {
                StoreError::config(format!(
                    "Unsupported storage type: {}. Supported types: memory, filesystem, cloud, gcp, aws, azure",
                    other
                ))
            }),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StorageKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Everything needed to build a repository
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageSettings {
    pub kind: StorageKind,
    pub content_dir: PathBuf,
    pub cloud: CloudSettings,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            cloud: CloudSettings::default(),
        }
    }
}

impl StorageSettings {
    /// Settings for a given kind with everything else defaulted
    pub fn with_kind(kind: StorageKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Provider the cloud backend will use, if this is a cloud kind
    pub fn effective_provider(&self) -> Option<CloudProvider> {
        match self.kind {
            StorageKind::Cloud(Some(provider)) => Some(provider),
            StorageKind::Cloud(None) => Some(self.cloud.provider),
            _ => None,
        }
    }
}

/// Build the repository described by `settings`.
///
/// A new instance is built on every call.
pub fn create_repository(settings: &StorageSettings) -> StoreResult<Arc<dyn ContentRepository>> {
    match settings.kind {
        StorageKind::Memory => {
            info!("Using in-memory content storage");
            Ok(Arc::new(InMemoryRepository::new()))
        }
        StorageKind::Filesystem => {
            info!(dir = %settings.content_dir.display(), "Using filesystem content storage");
            Ok(Arc::new(FilesystemRepository::open(&settings.content_dir)?))
        }
        StorageKind::Cloud(_) => {
            let mut cloud = settings.cloud.clone();
            if let Some(provider) = settings.effective_provider() {
                cloud.provider = provider;
            }
            info!(provider = %cloud.provider, "Using cloud content storage");
            Ok(Arc::new(ObjectStoreRepository::connect(&cloud)?))
        }
    }
}
