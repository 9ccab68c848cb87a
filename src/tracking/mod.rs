//! Change-tracking provider interface
//!
//! The audit engine never looks at entities directly. Everything it knows
//! about an aggregate (lifecycle state, old/new field values, relationship
//! metadata, primary keys) comes through the [`ChangeTracker`] trait.
//!
//! Provider conventions the engine relies on:
//!
//! - A `Deleted` entity reports its current values equal to its original
//!   values.
//! - An `Added` entity reports `Value::Null` as the original of every field.
//! - `was_modified` is only meaningful for `Modified` entities and is reported
//!   per field.
//! - Handles that the provider does not track report [`ChangeState::Detached`].

pub mod change_set;
pub mod memory;
pub mod model;

pub use change_set::{ChangeSet, ChangeSetEntity};
pub use memory::InMemoryTracker;
pub use model::{EntityTypeMeta, Model, PropertyMeta, StructuralMeta};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::AuditResult;

/// Lifecycle state of a tracked entity instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeState {
    Added,
    Modified,
    Deleted,
    Unchanged,
    Detached,
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "Added"),
            Self::Modified => write!(f, "Modified"),
            Self::Deleted => write!(f, "Deleted"),
            Self::Unchanged => write!(f, "Unchanged"),
            Self::Detached => write!(f, "Detached"),
        }
    }
}

/// Opaque handle to a tracked entity instance
///
/// Handles compare by identity: two entities holding equal values are still
/// two different handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef(u64);

impl EntityRef {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// How an entity type relates to the aggregate it lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Consistency boundary; other aggregates only ever reference it
    AggregateRoot,
    /// Ordinary entity with its own identity
    #[default]
    Entity,
    /// Lifecycle-bound to its owner, no identity outside of it
    Owned,
}

impl EntityKind {
    /// Owned types are treated as value objects by the deleted-field rule
    pub fn is_value_object(&self) -> bool {
        matches!(self, Self::Owned)
    }
}

/// Ownership classification of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Targets are created and deleted with the parent; fully diffed
    Ownership,
    /// Targets are independent aggregate roots; only the reference is audited
    Reference,
    /// Targets are many-to-many join rows
    Association,
}

/// A navigation from one entity type to another
///
/// `foreign_key` names the fields on the target type that hold the parent's
/// primary key, in the same order as the parent's key parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMeta {
    pub name: String,
    pub target_type: String,
    #[serde(default = "default_is_collection")]
    pub is_collection: bool,
    pub classification: Classification,
    pub foreign_key: Vec<String>,
}

fn default_is_collection() -> bool {
    true
}

impl RelationshipMeta {
    fn with_classification(
        name: impl Into<String>,
        target_type: impl Into<String>,
        classification: Classification,
        foreign_key: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            is_collection: true,
            classification,
            foreign_key: foreign_key.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Owned collection whose rows carry `foreign_key` back to the parent
    pub fn ownership(
        name: impl Into<String>,
        target_type: impl Into<String>,
        foreign_key: &[&str],
    ) -> Self {
        Self::with_classification(name, target_type, Classification::Ownership, foreign_key)
    }

    /// Collection of independent aggregate roots pointing at the parent
    pub fn reference(
        name: impl Into<String>,
        target_type: impl Into<String>,
        foreign_key: &[&str],
    ) -> Self {
        Self::with_classification(name, target_type, Classification::Reference, foreign_key)
    }

    /// Many-to-many join rows keyed (partly) by the parent's key
    pub fn association(
        name: impl Into<String>,
        target_type: impl Into<String>,
        foreign_key: &[&str],
    ) -> Self {
        Self::with_classification(name, target_type, Classification::Association, foreign_key)
    }

    /// Mark the navigation as single-valued
    pub fn single(mut self) -> Self {
        self.is_collection = false;
        self
    }
}

/// One scalar field of an entity or structural value with its old/new value
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub name: String,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub was_modified: bool,
    pub original: Value,
    pub current: Value,
}

impl ScalarField {
    pub fn new(name: impl Into<String>, original: Value, current: Value) -> Self {
        Self {
            name: name.into(),
            is_primary_key: false,
            is_foreign_key: false,
            was_modified: false,
            original,
            current,
        }
    }

    pub fn modified(mut self, was_modified: bool) -> Self {
        self.was_modified = was_modified;
        self
    }
}

/// An embedded value object with its own scalars and nested value objects
///
/// A wholesale replacement is reported as two entries with the same name:
/// one `Deleted` carrying the old values and one `Added` carrying the new.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralField {
    pub name: String,
    pub state: ChangeState,
    pub scalar_fields: Vec<ScalarField>,
    pub nested: Vec<StructuralField>,
}

/// One named part of a (possibly composite) primary key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPart {
    pub name: String,
    pub value: Value,
}

/// Ordered key parts identifying an entity
pub type PrimaryKey = Vec<KeyPart>;

/// The capabilities the audit engine needs from a change tracker
///
/// Implementations are queried repeatedly during one traversal and must
/// present a stable snapshot for its duration.
pub trait ChangeTracker {
    /// Lifecycle state of `entity`
    fn state(&self, entity: EntityRef) -> AuditResult<ChangeState>;

    /// Name of the entity type `entity` belongs to
    fn entity_type(&self, entity: EntityRef) -> AuditResult<String>;

    /// Kind of an entity type
    fn entity_kind(&self, entity_type: &str) -> AuditResult<EntityKind>;

    /// Scalar fields of `entity`, primary key and foreign keys included
    fn scalar_fields(&self, entity: EntityRef) -> AuditResult<Vec<ScalarField>>;

    /// Structural (value-object) fields of `entity`
    fn structural_fields(&self, entity: EntityRef) -> AuditResult<Vec<StructuralField>>;

    /// Relationships declared on an entity type
    fn relationships(&self, entity_type: &str) -> AuditResult<Vec<RelationshipMeta>>;

    /// Every tracked entity of an entity type, in a stable order
    fn tracked_entities_of_type(&self, entity_type: &str) -> AuditResult<Vec<EntityRef>>;

    /// Primary key of `entity`
    fn primary_key(&self, entity: EntityRef) -> AuditResult<PrimaryKey>;
}
