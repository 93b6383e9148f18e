//! contentstore - JSON content repository with pluggable storage
//!
//! Stores interactive-content records (title, opaque parameters and
//! metadata, timestamps) behind one async repository contract, with the
//! backend chosen once at startup.
//!
//! # Modules
//!
//! - `domain`: Data structures (ContentId, ContentRecord, ContentDraft)
//! - `repository`: Storage backends (memory, filesystem, cloud object stores)
//! - `config`: Environment and config-file resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Save content to disk
//! STORAGE_TYPE=filesystem contentstore save --id x1 --title Quiz \
//!     --library "quiz-v1" --parameters '{"q": "2+2?"}'
//!
//! # Read it back
//! STORAGE_TYPE=filesystem contentstore get x1
//!
//! # Check storage health
//! contentstore --storage-type aws health
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod repository;

// Re-export main types at crate root for convenience
pub use domain::{ContentDraft, ContentId, ContentRecord, ContentSummary};
pub use error::{StoreError, StoreResult};
pub use repository::{
    create_repository, ContentRepository, FilesystemRepository, HealthReport, InMemoryRepository,
    ObjectStoreRepository, StorageKind, StorageSettings,
};
