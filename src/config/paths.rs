//! Path management for graph-audit
//!
//! ## Path Resolution Order
//!
//! 1. `GRAPH_AUDIT_DIR` environment variable (if set)
//! 2. The platform configuration directory, e.g. `~/.config/graph-audit`
//!    on Linux or `%APPDATA%\graph-audit\config` on Windows

use directories::ProjectDirs;
use std::path::PathBuf;

use crate::error::AuditError;

/// Environment variable overriding the base directory
pub const DIR_ENV_VAR: &str = "GRAPH_AUDIT_DIR";

/// Manages all paths used by graph-audit
#[derive(Debug, Clone)]
pub struct AuditPaths {
    /// Base directory for all graph-audit files
    base_dir: PathBuf,
}

impl AuditPaths {
    /// Create a new AuditPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined and no
    /// override is set.
    pub fn new() -> Result<Self, AuditError> {
        let base_dir = match std::env::var_os(DIR_ENV_VAR) {
            Some(custom) => PathBuf::from(custom),
            None => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create AuditPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Ensure the base directory exists
    pub fn ensure_directories(&self) -> Result<(), AuditError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| AuditError::Io(format!("Failed to create base directory: {}", e)))?;

        Ok(())
    }

    /// Check if graph-audit has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

fn resolve_default_path() -> Result<PathBuf, AuditError> {
    ProjectDirs::from("", "", "graph-audit")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| AuditError::Config("Could not determine home directory".into()))
}
