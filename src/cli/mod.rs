//! Command-line interface for contentstore.
//!
//! Provides commands for saving, reading, listing and deleting content,
//! plus storage health and configuration checks.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::warn;

use crate::config::{self, ResolvedConfig};
use crate::domain::{ContentDraft, ContentId, ContentRecord, ContentSummary};
use crate::error::StoreError;
use crate::repository::{create_repository, ContentRepository, HealthReport};

/// contentstore - JSON content repository with pluggable storage
#[derive(Parser, Debug)]
#[command(name = "contentstore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Storage backend (memory, filesystem, cloud, gcp, aws, azure);
    /// overrides STORAGE_TYPE and the config file
    #[arg(short = 's', long, global = true)]
    pub storage_type: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or replace a piece of content
    Save {
        /// Content ID (a UUID is generated if not provided)
        #[arg(long)]
        id: Option<String>,

        /// Display title
        #[arg(short, long)]
        title: Option<String>,

        /// Main library, e.g. "H5P.MultiChoice 1.16"
        #[arg(short, long)]
        library: Option<String>,

        /// Parameters as inline JSON or @path/to/file.json
        #[arg(short, long)]
        parameters: Option<String>,

        /// Metadata as inline JSON or @path/to/file.json
        #[arg(short, long)]
        metadata: Option<String>,
    },

    /// Print a stored record as JSON
    Get {
        /// Content ID
        id: String,
    },

    /// List stored content, newest first
    List {
        /// Maximum number of items to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Print summaries as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete a record (missing ids are not an error)
    Delete {
        /// Content ID
        id: String,
    },

    /// Check whether a record exists
    Exists {
        /// Content ID
        id: String,
    },

    /// Report storage health as JSON
    Health,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = config::load_settings(self.storage_type.as_deref())?;

        if let Commands::Config = self.command {
            show_config(&config);
            return Ok(());
        }

        let repository = create_repository(&config.storage)
            .context("Failed to initialise content storage")?;

        match self.command {
            Commands::Save {
                id,
                title,
                library,
                parameters,
                metadata,
            } => {
                let draft = ContentDraft {
                    title,
                    main_library: library,
                    parameters: parameters.as_deref().map(parse_json_arg).transpose()?,
                    metadata: metadata.as_deref().map(parse_json_arg).transpose()?,
                    preloaded_dependencies: None,
                };
                save_content(repository, id, draft).await
            }
            Commands::Get { id } => get_content(repository, &id).await,
            Commands::List { limit, json } => list_content(repository, limit, json).await,
            Commands::Delete { id } => delete_content(repository, &id).await,
            Commands::Exists { id } => exists_content(repository, &id).await,
            Commands::Health => health(repository).await,
            Commands::Config => Ok(()),
        }
    }
}

/// Parse a content id given on the command line
fn parse_id(id: &str) -> Result<ContentId> {
    ContentId::new(id).with_context(|| format!("Invalid content ID: {}", id))
}

/// Parse inline JSON, or the contents of a file when prefixed with `@`
fn parse_json_arg(value: &str) -> Result<Value> {
    let text = match value.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read JSON file: {}", path))?,
        None => value.to_string(),
    };

    serde_json::from_str(&text).with_context(|| format!("Invalid JSON: {}", value))
}

/// Shorten a title for table output without splitting characters
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Create or update a record from a draft
async fn save_content(
    repository: Arc<dyn ContentRepository>,
    id: Option<String>,
    draft: ContentDraft,
) -> Result<()> {
    let id = match id {
        Some(id) => parse_id(&id)?,
        None => ContentId::generate(),
    };

    // A corrupt record is replaced rather than blocking the save
    let existing = match repository.get(&id).await {
        Ok(existing) => existing,
        Err(StoreError::Malformed { key, source }) => {
            warn!(%id, key = %key, error = %source, "Replacing unreadable record");
            None
        }
        Err(e) => return Err(e.into()),
    };
    let record = ContentRecord::from_draft(id.clone(), draft, Utc::now(), existing.as_ref());

    repository
        .save(&id, &record)
        .await
        .with_context(|| format!("Failed to save content: {}", id))?;

    let action = if existing.is_some() { "updated" } else { "created" };
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "success": true,
            "contentId": id,
            "action": action,
        }))?
    );

    Ok(())
}

/// Print one record
async fn get_content(repository: Arc<dyn ContentRepository>, id: &str) -> Result<()> {
    let id = parse_id(id)?;

    match repository.get(&id).await? {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        None => anyhow::bail!("Content not found: {}", id),
    }
}

/// List records as a table or JSON summaries
async fn list_content(repository: Arc<dyn ContentRepository>, limit: usize, as_json: bool) -> Result<()> {
    let records = repository.list().await?;
    let summaries: Vec<ContentSummary> = records.iter().take(limit).map(ContentSummary::from).collect();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No content stored. Use 'contentstore save' to add some.");
        return Ok(());
    }

    println!("{:<38} {:<24} {:<26} {:<30}", "ID", "LIBRARY", "CREATED", "TITLE");
    println!("{}", "-".repeat(120));

    for summary in &summaries {
        println!(
            "{:<38} {:<24} {:<26} {:<30}",
            truncate(summary.id.as_str(), 38),
            truncate(&summary.main_library, 24),
            summary.created_at,
            truncate(&summary.title, 30)
        );
    }

    println!("\nTotal: {} items", records.len());

    Ok(())
}

/// Delete one record
async fn delete_content(repository: Arc<dyn ContentRepository>, id: &str) -> Result<()> {
    let id = parse_id(id)?;

    repository
        .delete(&id)
        .await
        .with_context(|| format!("Failed to delete content: {}", id))?;

    println!("Deleted content: {}", id);
    Ok(())
}

/// Print whether a record exists
async fn exists_content(repository: Arc<dyn ContentRepository>, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    println!("{}", repository.exists(&id).await?);
    Ok(())
}

/// Print the storage health report
async fn health(repository: Arc<dyn ContentRepository>) -> Result<()> {
    let report = HealthReport::collect(repository.as_ref()).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_healthy() {
        anyhow::bail!("Storage health check failed");
    }
    Ok(())
}

/// Show resolved configuration
fn show_config(config: &ResolvedConfig) {
    let storage = &config.storage;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("  Content Store Configuration");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Storage:");
    println!("  Type:         {}", storage.kind);
    println!("  Content dir:  {}", storage.content_dir.display());

    if let Some(provider) = storage.effective_provider() {
        let cloud = &storage.cloud;
        let unset = || "(unset)".to_string();

        println!();
        println!("Cloud:");
        println!("  Provider:     {}", provider);
        println!("  Bucket:       {}", cloud.bucket.clone().unwrap_or_else(unset));
        println!("  Project:      {}", cloud.project_id.clone().unwrap_or_else(unset));
        println!("  Region:       {}", cloud.region.clone().unwrap_or_else(unset));
        println!("  Endpoint:     {}", cloud.endpoint.clone().unwrap_or_else(unset));
        println!(
            "  Credentials:  {}",
            if cloud.credentials.is_some() { "(set)" } else { "(from environment)" }
        );
    }
}
