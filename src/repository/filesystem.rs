//! Filesystem repository: one pretty-printed JSON file per record.
//!
//! # Storage Layout
//!
//! ```text
//! <content_dir>/
//! ├── <id>.json        # full ContentRecord, 2-space indented
//! └── .<random>.tmp    # in-flight write, renamed over <id>.json
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use super::{check_save, decode_record, encode_record, ContentRepository};
use crate::domain::{sort_newest_first, ContentId, ContentRecord};
use crate::error::StoreResult;

/// Repository storing records as files in a directory
#[derive(Debug, Clone)]
pub struct FilesystemRepository {
    root: PathBuf,
}

impl FilesystemRepository {
    /// Create a repository rooted at `root` without touching the disk.
    ///
    /// The directory is created on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a repository and make sure its directory exists
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        info!(root = %root.display(), "Opened filesystem content repository");
        Ok(Self { root })
    }

    /// Directory holding the record files
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `id`
    pub fn record_path(&self, id: &ContentId) -> PathBuf {
        self.root.join(id.file_name())
    }
}

#[async_trait]
impl ContentRepository for FilesystemRepository {
    fn kind(&self) -> &str {
        "filesystem"
    }

    async fn save(&self, id: &ContentId, record: &ContentRecord) -> StoreResult<()> {
        check_save(id, record)?;

        let body = encode_record(record)?;
        let root = self.root.clone();
        let path = self.record_path(id);

        tokio::task::spawn_blocking(move || write_atomically(&root, &path, &body)).await??;

        debug!(%id, "Saved record to disk");
        Ok(())
    }

    async fn get(&self, id: &ContentId) -> StoreResult<Option<ContentRecord>> {
        match fs::read(self.record_path(id)).await {
            Ok(bytes) => decode_record(&id.file_name(), &bytes).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> StoreResult<Vec<ContentRecord>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };

            if ContentId::from_file_name(name).is_none() || entry.file_type().await?.is_dir() {
                continue;
            }

            match fs::read(entry.path()).await {
                Ok(bytes) => match decode_record(name, &bytes) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(file = name, error = %e, "Skipping unreadable record"),
                },
                // Deleted between read_dir and read
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(file = name, "Record vanished while listing");
                }
                Err(e) => return Err(e.into()),
            }
        }

        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: &ContentId) -> StoreResult<()> {
        match fs::remove_file(self.record_path(id)).await {
            Ok(()) => {
                debug!(%id, "Deleted record from disk");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, id: &ContentId) -> StoreResult<bool> {
        // Directories named like records are not records, matching `list`
        match fs::metadata(self.record_path(id)).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `body` to a temp file next to `path`, then rename it into place
fn write_atomically(dir: &Path, path: &Path, body: &[u8]) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    file.write_all(body)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    Ok(())
}
