//! Storage health summary.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ContentRepository;
use crate::domain::format_timestamp;

/// Overall storage state (`ok` or `error` on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

/// Health report as returned by the health endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: String,
    pub storage_type: String,
    pub content_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    /// Probe `repository` with a single `list` call
    pub async fn collect(repository: &dyn ContentRepository) -> Self {
        let timestamp = format_timestamp(Utc::now());
        let storage_type = repository.kind().to_string();

        match repository.list().await {
            Ok(records) => Self {
                status: HealthStatus::Ok,
                timestamp,
                storage_type,
                content_count: records.len(),
                error: None,
            },
            Err(e) => {
                warn!(storage = %storage_type, error = %e, "Storage health check failed");
                Self {
                    status: HealthStatus::Error,
                    timestamp,
                    storage_type,
                    content_count: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}
