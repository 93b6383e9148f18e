//! Domain types for the content repository.
//!
//! - ContentRecord: the stored unit
//! - ContentId: validated identifier
//! - ContentDraft / ContentSummary: request and listing views

pub mod record;

// Re-export commonly used types
pub use record::{
    format_timestamp, sort_newest_first, ContentDraft, ContentId, ContentRecord, ContentSummary,
    DEFAULT_MAIN_LIBRARY, DEFAULT_TITLE, RECORD_EXTENSION,
};
