//! Change-set documents
//!
//! A change set is a JSON document describing a model, a set of tracked
//! entities with their original/current records and the aggregate root to
//! audit. It lets callers feed pending changes captured elsewhere into the
//! engine without implementing [`ChangeTracker`](super::ChangeTracker).
//!
//! ```json
//! {
//!   "types": [{ "name": "Order", "kind": "aggregate_root", "primary_key": ["Id"] }],
//!   "entities": [
//!     { "id": "o1", "type": "Order", "state": "modified",
//!       "original": { "Id": 1, "Status": "open" },
//!       "current":  { "Id": 1, "Status": "paid" } }
//!   ],
//!   "root": "o1"
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use super::memory::InMemoryTracker;
use super::model::{EntityTypeMeta, Model};
use super::{ChangeState, EntityRef};
use crate::error::{AuditError, AuditResult};

/// One tracked entity inside a change-set document
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeSetEntity {
    /// Document-local identifier, referenced by `root`
    pub id: String,

    #[serde(rename = "type")]
    pub entity_type: String,

    pub state: ChangeState,

    #[serde(default)]
    pub original: Value,

    #[serde(default)]
    pub current: Value,

    /// Structural fields substituted wholesale
    #[serde(default)]
    pub replaced: Vec<String>,
}

/// A complete change-set document
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeSet {
    pub types: Vec<EntityTypeMeta>,
    pub entities: Vec<ChangeSetEntity>,
    pub root: String,
}

impl ChangeSet {
    /// Parse a change set from a JSON string
    pub fn from_json(contents: &str) -> AuditResult<Self> {
        serde_json::from_str(contents)
            .map_err(|e| AuditError::ChangeSet(format!("Failed to parse change set: {}", e)))
    }

    /// Read and parse a change set file
    pub fn load(path: &Path) -> AuditResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AuditError::Io(format!(
                "Failed to read change set {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Load the document into a tracker and resolve the root handle
    pub fn into_tracker(self) -> AuditResult<(InMemoryTracker, EntityRef)> {
        let model: Model = self.types.into_iter().collect();
        let mut tracker = InMemoryTracker::new(model);
        let mut handles: HashMap<String, EntityRef> = HashMap::new();

        for entity in self.entities {
            if handles.contains_key(&entity.id) {
                return Err(AuditError::ChangeSet(format!(
                    "duplicate entity id '{}'",
                    entity.id
                )));
            }
            if tracker.model().get(&entity.entity_type).is_none() {
                return Err(AuditError::ChangeSet(format!(
                    "entity '{}' has unknown type '{}'",
                    entity.id, entity.entity_type
                )));
            }

            let current = match (entity.state, entity.current) {
                (ChangeState::Unchanged, Value::Null) => entity.original.clone(),
                (_, current) => current,
            };
            let handle = tracker.track(&entity.entity_type, entity.state, entity.original, current)?;

            let replaceable = matches!(entity.state, ChangeState::Modified | ChangeState::Unchanged);
            for structural in entity.replaced.iter().filter(|_| replaceable) {
                let value = tracker.get(handle, structural).unwrap_or(Value::Null);
                tracker.replace_structural(handle, structural, value)?;
            }

            handles.insert(entity.id, handle);
        }

        let root = handles
            .get(&self.root)
            .copied()
            .ok_or_else(|| AuditError::ChangeSet(format!("unknown root '{}'", self.root)))?;

        Ok((tracker, root))
    }
}
