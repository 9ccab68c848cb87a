//! Entity-type metadata
//!
//! Describes the shape of each entity type known to a tracker: key fields,
//! scalar properties, embedded value objects and relationships. Built in code
//! through the builder methods or deserialized from a change-set document.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{EntityKind, RelationshipMeta};
use crate::error::{AuditError, AuditResult};

/// A scalar property of an entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMeta {
    pub name: String,
    #[serde(default)]
    pub foreign_key: bool,
}

/// An embedded value object and its (possibly nested) fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralMeta {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub nested: Vec<StructuralMeta>,
}

impl StructuralMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.properties.push(name.into());
        self
    }

    pub fn nested(mut self, nested: StructuralMeta) -> Self {
        self.nested.push(nested);
        self
    }
}

/// Metadata for one entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTypeMeta {
    pub name: String,

    #[serde(default)]
    pub kind: EntityKind,

    /// Key fields in key order
    pub primary_key: Vec<String>,

    /// Non-key scalar properties
    #[serde(default)]
    pub properties: Vec<PropertyMeta>,

    #[serde(default)]
    pub structurals: Vec<StructuralMeta>,

    #[serde(default)]
    pub relationships: Vec<RelationshipMeta>,
}

impl EntityTypeMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntityKind::default(),
            primary_key: Vec::new(),
            properties: Vec::new(),
            structurals: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: EntityKind) -> Self {
        self.kind = kind;
        self
    }

    /// Append a key field (call repeatedly for composite keys)
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.primary_key.push(name.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.properties.push(PropertyMeta {
            name: name.into(),
            foreign_key: false,
        });
        self
    }

    pub fn foreign_key(mut self, name: impl Into<String>) -> Self {
        self.properties.push(PropertyMeta {
            name: name.into(),
            foreign_key: true,
        });
        self
    }

    pub fn structural(mut self, structural: StructuralMeta) -> Self {
        self.structurals.push(structural);
        self
    }

    pub fn relationship(mut self, relationship: RelationshipMeta) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Whether a field is one of the key fields
    pub fn is_key(&self, field: &str) -> bool {
        self.primary_key.iter().any(|k| k == field)
    }

    /// Whether a property holds another entity's key
    pub fn is_foreign_key(&self, field: &str) -> bool {
        self.properties
            .iter()
            .any(|p| p.name == field && p.foreign_key)
    }
}

/// The set of entity types a tracker knows about
#[derive(Debug, Clone, Default)]
pub struct Model {
    types: HashMap<String, EntityTypeMeta>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type, replacing any earlier one with the same name
    pub fn with_type(mut self, meta: EntityTypeMeta) -> Self {
        self.register(meta);
        self
    }

    pub fn register(&mut self, meta: EntityTypeMeta) {
        self.types.insert(meta.name.clone(), meta);
    }

    pub fn get(&self, name: &str) -> Option<&EntityTypeMeta> {
        self.types.get(name)
    }

    /// Look up an entity type, failing with a provider contract error
    pub fn require(&self, name: &str) -> AuditResult<&EntityTypeMeta> {
        self.get(name)
            .ok_or_else(|| AuditError::unknown_entity_type(name))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<EntityTypeMeta> for Model {
    fn from_iter<I: IntoIterator<Item = EntityTypeMeta>>(iter: I) -> Self {
        let mut model = Model::new();
        for meta in iter {
            model.register(meta);
        }
        model
    }
}
