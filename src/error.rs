//! Custom error types for graph-audit
//!
//! This module defines the error hierarchy for the crate using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

use crate::tracking::EntityRef;

/// The main error type for graph-audit operations
#[derive(Error, Debug)]
pub enum AuditError {
    /// The change-tracking provider broke its contract (missing metadata,
    /// unknown entity types). Aborts the traversal.
    #[error("Provider contract violation: {0}")]
    ProviderContract(String),

    /// An entity handle the provider does not track
    #[error("Unknown entity: {entity}")]
    UnknownEntity { entity: EntityRef },

    /// Primary key could not be determined for an entity type
    #[error("Primary key could not be determined for {entity_type}")]
    MissingPrimaryKey { entity_type: String },

    /// Misuse of a tracker (bad record shape, mutating a deleted entity)
    #[error("Tracking error: {0}")]
    Tracking(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// YAML serialization errors
    #[error("YAML error: {0}")]
    Yaml(String),

    /// Malformed change-set documents
    #[error("Change set error: {0}")]
    ChangeSet(String),
}

impl AuditError {
    /// Create a provider contract violation for a relationship
    pub fn relationship_contract(
        entity_type: &str,
        relationship: &str,
        problem: impl std::fmt::Display,
    ) -> Self {
        Self::ProviderContract(format!(
            "relationship '{}.{}' {}",
            entity_type, relationship, problem
        ))
    }

    /// Create a provider contract violation for an unregistered entity type
    pub fn unknown_entity_type(entity_type: impl Into<String>) -> Self {
        Self::ProviderContract(format!("unknown entity type '{}'", entity_type.into()))
    }

    /// Check if this error aborts a traversal
    pub fn is_provider_contract(&self) -> bool {
        matches!(
            self,
            Self::ProviderContract(_) | Self::UnknownEntity { .. } | Self::MissingPrimaryKey { .. }
        )
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for AuditError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

/// Result type alias for graph-audit operations
pub type AuditResult<T> = Result<T, AuditError>;
