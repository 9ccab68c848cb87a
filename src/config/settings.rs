//! User settings for graph-audit
//!
//! Manages audit preferences: how deleted entities are recorded, who is
//! stamped on field records, and how reports are printed.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::paths::AuditPaths;
use crate::audit::{AuditOptions, DeletedFieldPolicy};
use crate::error::AuditError;
use crate::models::ActorId;

/// How audit reports are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON report (default)
    #[default]
    Json,
    /// YAML report
    Yaml,
    /// Table of changed paths
    Table,
    /// One line per record
    Summary,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
            Self::Table => write!(f, "table"),
            Self::Summary => write!(f, "summary"),
        }
    }
}

/// User settings for graph-audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Which deleted entities keep per-field records
    #[serde(default)]
    pub deleted_fields: DeletedFieldPolicy,

    /// Actor stamped on every field record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<ActorId>,

    /// Default output format
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_schema_version() -> u32 {
    1
}

fn default_pretty() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            deleted_fields: DeletedFieldPolicy::default(),
            actor_id: None,
            output_format: OutputFormat::default(),
            pretty: default_pretty(),
        }
    }
}

impl Settings {
    /// Engine options derived from these settings
    pub fn audit_options(&self) -> AuditOptions {
        AuditOptions {
            deleted_fields: self.deleted_fields,
            actor_id: self.actor_id,
        }
    }

    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &AuditPaths) -> Result<Self, AuditError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| AuditError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                AuditError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            tracing::debug!(path = %settings_path.display(), "Loaded settings");
            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &AuditPaths) -> Result<(), AuditError> {
        paths.ensure_directories()?;

        let settings_path = paths.settings_file();
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| AuditError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(&settings_path, contents)
            .map_err(|e| AuditError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
