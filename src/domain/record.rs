//! Content records stored by the repositories.
//!
//! A record is opaque to storage apart from its id and its `createdAt`
//! timestamp, which drives list ordering. `parameters` and `metadata` are
//! arbitrary JSON documents and are round-tripped untouched.

use std::cmp::Reverse;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// File/blob suffix for a stored record
pub const RECORD_EXTENSION: &str = ".json";

/// Longest accepted content id
pub const MAX_ID_LEN: usize = 128;

/// Title used when a draft does not carry one
pub const DEFAULT_TITLE: &str = "Untitled Content";

/// Content type used when a draft does not name one
pub const DEFAULT_MAIN_LIBRARY: &str = "H5P.Text 1.1";

/// Content identifier.
///
/// Ids come from callers and end up as file names and object keys, so they
/// are restricted to `[A-Za-z0-9_-]{1,128}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Validate and wrap a caller-supplied id
    pub fn new(id: impl Into<String>) -> StoreResult<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(StoreError::InvalidId {
                id,
                reason: "id must not be empty",
            });
        }

        if id.len() > MAX_ID_LEN {
            return Err(StoreError::InvalidId {
                id,
                reason: "id is longer than 128 characters",
            });
        }

        if !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(StoreError::InvalidId {
                id,
                reason: "only ASCII letters, digits, '-' and '_' are allowed",
            });
        }

        Ok(Self(id))
    }

    /// Generate a fresh random id (UUID v4)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name / object key for this record (`{id}.json`)
    pub fn file_name(&self) -> String {
        format!("{}{}", self.0, RECORD_EXTENSION)
    }

    /// Recover an id from a stored file name, if it follows the naming convention
    pub fn from_file_name(name: &str) -> Option<Self> {
        name.strip_suffix(RECORD_EXTENSION)
            .and_then(|stem| Self::new(stem).ok())
    }
}

impl TryFrom<String> for ContentId {
    type Error = StoreError;

    fn try_from(value: String) -> StoreResult<Self> {
        Self::new(value)
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ContentId {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        Self::new(s)
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single stored piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    /// Caller-assigned identifier
    pub id: ContentId,

    /// Display name
    pub title: String,

    /// Type-specific payload, never inspected
    pub parameters: Value,

    /// Content type and version, e.g. `H5P.Text 1.1`
    pub main_library: String,

    /// Descriptive envelope (authorship, license, language), never inspected
    pub metadata: Value,

    /// ISO-8601 creation time, stored verbatim
    pub created_at: String,

    /// ISO-8601 last update time, stored verbatim
    pub updated_at: String,
}

impl ContentRecord {
    /// Build a record the way the content editor endpoint does: defaults for
    /// anything the draft leaves out, fresh timestamps, and the creation time
    /// carried over from `existing` when this is an update.
    pub fn from_draft(
        id: ContentId,
        draft: ContentDraft,
        now: DateTime<Utc>,
        existing: Option<&ContentRecord>,
    ) -> Self {
        let title = non_empty(draft.title).unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let main_library =
            non_empty(draft.main_library).unwrap_or_else(|| DEFAULT_MAIN_LIBRARY.to_string());
        let parameters = draft.parameters.unwrap_or_else(|| json!({}));

        let metadata = match draft.metadata {
            Some(metadata) => metadata,
            None => default_metadata(
                &title,
                &main_library,
                draft.preloaded_dependencies,
                now.year(),
            ),
        };

        let timestamp = format_timestamp(now);
        let created_at = existing
            .map(|record| record.created_at.clone())
            .unwrap_or_else(|| timestamp.clone());

        Self {
            id,
            title,
            parameters,
            main_library,
            metadata,
            created_at,
            updated_at: timestamp,
        }
    }

    /// Check the invariants storage relies on
    pub fn validate(&self) -> StoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(StoreError::InvalidRecord(format!(
                "record '{}' has an empty title",
                self.id
            )));
        }
        Ok(())
    }

    /// Creation time in milliseconds since the epoch.
    ///
    /// Unparseable timestamps count as the epoch so they sort last.
    pub fn created_at_millis(&self) -> i64 {
        parse_timestamp_millis(&self.created_at).unwrap_or(0)
    }

    /// Trimmed view used by content listings
    pub fn summary(&self) -> ContentSummary {
        ContentSummary::from(self)
    }
}

/// Request body accepted when creating or updating content.
///
/// Every field is optional; [`ContentRecord::from_draft`] fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDraft {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub main_library: Option<String>,

    #[serde(default)]
    pub parameters: Option<Value>,

    #[serde(default)]
    pub metadata: Option<Value>,

    #[serde(default)]
    pub preloaded_dependencies: Option<Value>,
}

/// Listing entry: a record without its payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub id: ContentId,
    pub title: String,
    pub main_library: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&ContentRecord> for ContentSummary {
    fn from(record: &ContentRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            main_library: record.main_library.clone(),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }
}

/// Sort records newest `createdAt` first, ties by ascending id
pub fn sort_newest_first(records: &mut [ContentRecord]) {
    records.sort_by_cached_key(|record| (Reverse(record.created_at_millis()), record.id.clone()));
}

/// Format a timestamp the way browsers' `toISOString` does
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Offset-less layouts read as UTC, most specific first
const NAIVE_TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

fn parse_timestamp_millis(value: &str) -> Option<i64> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.timestamp_millis());
    }

    // Offset but no seconds ("2024-02-01T00:00+01:00")
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M%:z") {
        return Some(parsed.timestamp_millis());
    }

    // No offset, or a bare "Z" the layouts above did not accept
    let naive = value
        .strip_suffix('Z')
        .or_else(|| value.strip_suffix('z'))
        .unwrap_or(value);
    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(parsed.and_utc().timestamp_millis());
        }
    }

    // Date-only values ("2024-01-01") are midnight UTC
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().timestamp_millis())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Split `H5P.Text 1.1` into a preloaded-dependency entry
fn library_dependency(main_library: &str) -> Option<Value> {
    let (machine_name, version) = main_library.trim().split_once(' ')?;
    let (major, minor) = version.trim().split_once('.')?;
    let major: u32 = major.parse().ok()?;
    let minor: u32 = minor.parse().ok()?;

    Some(json!({
        "machineName": machine_name,
        "majorVersion": major,
        "minorVersion": minor,
    }))
}

fn default_metadata(
    title: &str,
    main_library: &str,
    preloaded_dependencies: Option<Value>,
    year: i32,
) -> Value {
    let dependencies = preloaded_dependencies.unwrap_or_else(|| {
        Value::Array(library_dependency(main_library).into_iter().collect())
    });

    json!({
        "title": title,
        "language": "en",
        "mainLibrary": main_library,
        "preloadedDependencies": dependencies,
        "embedTypes": ["div"],
        "license": "U",
        "defaultLanguage": "en",
        "authors": [{ "name": "Default Author", "role": "Author" }],
        "licenseVersion": "4.0",
        "yearFrom": year.to_string(),
        "yearTo": year.to_string(),
        "changes": [],
        "contentType": "Text",
    })
}
