//! Storage configuration.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (STORAGE_TYPE, CONTENT_DIR, BUCKET_NAME, ...)
//! 2. Config file (.contentstore/config.yaml)
//! 3. Defaults (in-memory storage, ./h5p/content)
//!
//! Config file discovery:
//! - Searches current directory and parents for .contentstore/config.yaml
//! - `content_dir` in the file is relative to the project root (the parent
//!   of .contentstore/)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::repository::{
    CloudProvider, CloudSettings, StorageKind, StorageSettings, DEFAULT_CONTENT_DIR,
};
use crate::repository::cloud::DEFAULT_AWS_REGION;

/// Directory holding the config file
pub const CONFIG_DIR: &str = ".contentstore";

/// Config file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// memory | filesystem | cloud | gcp | aws | azure
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Filesystem root (relative to the project root)
    pub content_dir: Option<String>,
    pub bucket: Option<String>,
    pub provider: Option<String>,
    pub project_id: Option<String>,
    pub credentials: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub storage: StorageSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching `start` and its parents
pub fn find_config_file_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.is_file() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from the environment and the discovered config file.
///
/// `storage_type` (the CLI flag) beats every other source for the kind.
pub fn load_settings(storage_type: Option<&str>) -> Result<ResolvedConfig> {
    let config_file = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_config_file_from(&cwd));

    let file = match &config_file {
        Some(path) => Some((path.as_path(), load_config_file(path)?)),
        None => None,
    };

    let storage = resolve(
        file.as_ref().map(|(path, file)| (*path, file)),
        |key| {
            if key == "STORAGE_TYPE" {
                if let Some(kind) = storage_type {
                    return Some(kind.to_string());
                }
            }
            std::env::var(key).ok()
        },
    )?;

    Ok(ResolvedConfig {
        storage,
        config_file,
    })
}

/// Merge environment, config file and defaults into storage settings.
///
/// `file` is the config file's path and contents; `env` looks up a variable.
/// Empty variables count as unset.
pub fn resolve<F>(file: Option<(&Path, &ConfigFile)>, env: F) -> Result<StorageSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());
    let storage = file.map(|(_, file)| file.storage.clone()).unwrap_or_default();

    let kind = match env("STORAGE_TYPE").or(storage.kind) {
        Some(kind) => kind.parse::<StorageKind>()?,
        None => StorageKind::default(),
    };

    let content_dir = match (env("CONTENT_DIR"), storage.content_dir, file) {
        (Some(dir), _, _) => PathBuf::from(dir),
        (None, Some(dir), Some((path, _))) => {
            // Project root is the parent of .contentstore/
            let base = path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."));
            resolve_path(base, &dir)
        }
        (None, Some(dir), None) => PathBuf::from(dir),
        (None, None, _) => PathBuf::from(DEFAULT_CONTENT_DIR),
    };

    let configured_provider = match env("CLOUD_PROVIDER").or(storage.provider) {
        Some(provider) => provider.parse::<CloudProvider>()?,
        None => CloudProvider::default(),
    };
    let provider = match kind {
        StorageKind::Cloud(Some(named)) => named,
        _ => configured_provider,
    };

    let env_credentials = match provider {
        CloudProvider::Gcp => env("GOOGLE_APPLICATION_CREDENTIALS"),
        CloudProvider::Aws => env("AWS_ACCESS_KEY_ID")
            .zip(env("AWS_SECRET_ACCESS_KEY"))
            .map(|(key, secret)| format!("{}:{}", key, secret)),
        CloudProvider::Azure => env("AZURE_STORAGE_CONNECTION_STRING"),
    };

    let mut region = env("AWS_REGION").or(storage.region);
    if provider == CloudProvider::Aws && region.is_none() {
        region = Some(DEFAULT_AWS_REGION.to_string());
    }

    Ok(StorageSettings {
        kind,
        content_dir,
        cloud: CloudSettings {
            provider,
            bucket: env("BUCKET_NAME").or(storage.bucket),
            project_id: env("PROJECT_ID").or(storage.project_id),
            credentials: env_credentials.or(storage.credentials),
            region,
            endpoint: env("STORAGE_ENDPOINT").or(storage.endpoint),
        },
    })
}
