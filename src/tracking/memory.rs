//! Snapshot-based in-memory change tracker
//!
//! Keeps an original and a current record per tracked entity and derives the
//! lifecycle state by comparing them, the way an ORM change tracker does
//! between two saves. Records are JSON objects; structural fields are nested
//! objects stored under their own name.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use super::model::{Model, StructuralMeta};
use super::{
    ChangeState, ChangeTracker, EntityKind, EntityRef, KeyPart, PrimaryKey, RelationshipMeta,
    ScalarField, StructuralField,
};
use crate::error::{AuditError, AuditResult};

#[derive(Debug, Clone)]
struct TrackedEntity {
    entity_type: String,
    state: ChangeState,
    original: Map<String, Value>,
    current: Map<String, Value>,
    /// Structural fields substituted wholesale since the last save
    replaced: BTreeSet<String>,
}

impl TrackedEntity {
    fn original_value(&self, field: &str) -> Value {
        self.original.get(field).cloned().unwrap_or(Value::Null)
    }

    fn current_value(&self, field: &str) -> Value {
        match self.state {
            ChangeState::Deleted => self.original_value(field),
            _ => self.current.get(field).cloned().unwrap_or(Value::Null),
        }
    }

    fn refresh_state(&mut self) {
        if matches!(self.state, ChangeState::Unchanged | ChangeState::Modified) {
            self.state = if self.original == self.current {
                ChangeState::Unchanged
            } else {
                ChangeState::Modified
            };
        }
    }
}

/// Reference change-tracking provider backed by in-memory snapshots
#[derive(Debug, Clone)]
pub struct InMemoryTracker {
    model: Model,
    entities: BTreeMap<EntityRef, TrackedEntity>,
    next_ref: u64,
}

impl InMemoryTracker {
    /// Create an empty tracker for the given model
    pub fn new(model: Model) -> Self {
        Self {
            model,
            entities: BTreeMap::new(),
            next_ref: 1,
        }
    }

    /// Get the model this tracker validates against
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Number of tracked entities, deleted ones included
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Track an entity in an explicit state
    ///
    /// `Added` entities ignore `original`; `Deleted` entities report
    /// `original` as their current values.
    pub fn track(
        &mut self,
        entity_type: &str,
        state: ChangeState,
        original: Value,
        current: Value,
    ) -> AuditResult<EntityRef> {
        self.model.require(entity_type)?;

        let original = match state {
            ChangeState::Added => Map::new(),
            _ => into_record(entity_type, original)?,
        };
        let current = match state {
            ChangeState::Deleted => original.clone(),
            _ => into_record(entity_type, current)?,
        };

        let entity = EntityRef::new(self.next_ref);
        self.next_ref += 1;
        self.entities.insert(
            entity,
            TrackedEntity {
                entity_type: entity_type.to_string(),
                state,
                original,
                current,
                replaced: BTreeSet::new(),
            },
        );
        Ok(entity)
    }

    /// Start tracking an already-persisted entity (Unchanged)
    pub fn attach(&mut self, entity_type: &str, record: Value) -> AuditResult<EntityRef> {
        self.track(entity_type, ChangeState::Unchanged, record.clone(), record)
    }

    /// Start tracking a new entity (Added)
    pub fn add(&mut self, entity_type: &str, record: Value) -> AuditResult<EntityRef> {
        self.track(entity_type, ChangeState::Added, Value::Null, record)
    }

    /// Current value of a field
    pub fn get(&self, entity: EntityRef, field: &str) -> Option<Value> {
        self.entities.get(&entity).map(|t| t.current_value(field))
    }

    /// Set a scalar field on a tracked entity
    pub fn set(&mut self, entity: EntityRef, field: &str, value: Value) -> AuditResult<()> {
        let tracked = self.mutable_entry(entity)?;
        tracked.current.insert(field.to_string(), value);
        tracked.refresh_state();
        Ok(())
    }

    /// Set one field inside a (possibly nested) structural value in place
    ///
    /// `path` starts with the structural field name and ends with the scalar
    /// being set, e.g. `["ValueObject", "NestedValueObject", "Value1"]`.
    pub fn set_structural(
        &mut self,
        entity: EntityRef,
        path: &[&str],
        value: Value,
    ) -> AuditResult<()> {
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| AuditError::Tracking("structural path is empty".into()))?;

        let tracked = self.mutable_entry(entity)?;
        let mut target = &mut tracked.current;
        for segment in parents {
            let slot = target
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            target = slot.as_object_mut().ok_or_else(|| {
                AuditError::Tracking(format!("'{}' is not a structural value", segment))
            })?;
        }
        target.insert(last.to_string(), value);
        tracked.refresh_state();
        Ok(())
    }

    /// Substitute a whole structural value (immutable value object semantics)
    pub fn replace_structural(
        &mut self,
        entity: EntityRef,
        name: &str,
        value: Value,
    ) -> AuditResult<()> {
        let tracked = self.mutable_entry(entity)?;
        tracked.current.insert(name.to_string(), value);
        if tracked.state != ChangeState::Added {
            tracked.replaced.insert(name.to_string());
        }
        tracked.refresh_state();
        Ok(())
    }

    /// Mark an entity for deletion
    ///
    /// Removing an entity that was never saved simply stops tracking it.
    pub fn remove(&mut self, entity: EntityRef) -> AuditResult<()> {
        let tracked = self
            .entities
            .get_mut(&entity)
            .ok_or(AuditError::UnknownEntity { entity })?;

        match tracked.state {
            ChangeState::Added => tracked.state = ChangeState::Detached,
            ChangeState::Unchanged | ChangeState::Modified => {
                tracked.state = ChangeState::Deleted;
                tracked.current = tracked.original.clone();
                tracked.replaced.clear();
            }
            ChangeState::Deleted | ChangeState::Detached => {}
        }
        Ok(())
    }

    /// Stop tracking an entity without deleting it
    pub fn detach(&mut self, entity: EntityRef) -> AuditResult<()> {
        let tracked = self
            .entities
            .get_mut(&entity)
            .ok_or(AuditError::UnknownEntity { entity })?;
        tracked.state = ChangeState::Detached;
        Ok(())
    }

    /// Persist pending changes: every surviving entity becomes Unchanged
    pub fn accept_all_changes(&mut self) {
        self.entities.retain(|_, t| {
            !matches!(t.state, ChangeState::Deleted | ChangeState::Detached)
        });
        for tracked in self.entities.values_mut() {
            tracked.original = tracked.current.clone();
            tracked.replaced.clear();
            tracked.state = ChangeState::Unchanged;
        }
    }

    fn entry(&self, entity: EntityRef) -> AuditResult<&TrackedEntity> {
        self.entities
            .get(&entity)
            .ok_or(AuditError::UnknownEntity { entity })
    }

    fn mutable_entry(&mut self, entity: EntityRef) -> AuditResult<&mut TrackedEntity> {
        let tracked = self
            .entities
            .get_mut(&entity)
            .ok_or(AuditError::UnknownEntity { entity })?;
        if matches!(tracked.state, ChangeState::Deleted | ChangeState::Detached) {
            return Err(AuditError::Tracking(format!(
                "cannot modify {} {} {}",
                tracked.state, tracked.entity_type, entity
            )));
        }
        Ok(tracked)
    }
}

fn into_record(entity_type: &str, record: Value) -> AuditResult<Map<String, Value>> {
    match record {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(AuditError::Tracking(format!(
            "record for {} must be a JSON object",
            entity_type
        ))),
    }
}

fn field_of(value: &Value, name: &str) -> Value {
    value.get(name).cloned().unwrap_or(Value::Null)
}

fn in_place_state(original: &Value, current: &Value) -> ChangeState {
    if original == current {
        ChangeState::Unchanged
    } else {
        ChangeState::Modified
    }
}

fn structural_field(
    meta: &StructuralMeta,
    state: ChangeState,
    original: &Value,
    current: &Value,
) -> StructuralField {
    let scalar_fields = meta
        .properties
        .iter()
        .map(|name| {
            let old = field_of(original, name);
            let new = field_of(current, name);
            let was_modified = state == ChangeState::Modified && old != new;
            ScalarField::new(name.clone(), old, new).modified(was_modified)
        })
        .collect();

    let nested = meta
        .nested
        .iter()
        .map(|nested| {
            let old = field_of(original, &nested.name);
            let new = field_of(current, &nested.name);
            let nested_state = match state {
                ChangeState::Modified | ChangeState::Unchanged => in_place_state(&old, &new),
                other => other,
            };
            structural_field(nested, nested_state, &old, &new)
        })
        .collect();

    StructuralField {
        name: meta.name.clone(),
        state,
        scalar_fields,
        nested,
    }
}

impl ChangeTracker for InMemoryTracker {
    fn state(&self, entity: EntityRef) -> AuditResult<ChangeState> {
        Ok(self
            .entities
            .get(&entity)
            .map(|t| t.state)
            .unwrap_or(ChangeState::Detached))
    }

    fn entity_type(&self, entity: EntityRef) -> AuditResult<String> {
        Ok(self.entry(entity)?.entity_type.clone())
    }

    fn entity_kind(&self, entity_type: &str) -> AuditResult<EntityKind> {
        Ok(self.model.require(entity_type)?.kind)
    }

    fn scalar_fields(&self, entity: EntityRef) -> AuditResult<Vec<ScalarField>> {
        let tracked = self.entry(entity)?;
        let meta = self.model.require(&tracked.entity_type)?;

        let keys = meta.primary_key.iter().map(|name| (name.as_str(), true));
        let properties = meta
            .properties
            .iter()
            .filter(|p| !meta.is_key(&p.name))
            .map(|p| (p.name.as_str(), false));

        Ok(keys
            .chain(properties)
            .map(|(name, is_key)| {
                let original = tracked.original_value(name);
                let current = tracked.current_value(name);
                let was_modified = tracked.state == ChangeState::Modified && original != current;
                ScalarField {
                    name: name.to_string(),
                    is_primary_key: is_key,
                    is_foreign_key: meta.is_foreign_key(name),
                    was_modified,
                    original,
                    current,
                }
            })
            .collect())
    }

    fn structural_fields(&self, entity: EntityRef) -> AuditResult<Vec<StructuralField>> {
        let tracked = self.entry(entity)?;
        let meta = self.model.require(&tracked.entity_type)?;

        let mut fields = Vec::new();
        for structural in &meta.structurals {
            let original = tracked.original_value(&structural.name);
            let current = tracked.current_value(&structural.name);

            match tracked.state {
                ChangeState::Added => fields.push(structural_field(
                    structural,
                    ChangeState::Added,
                    &Value::Null,
                    &current,
                )),
                ChangeState::Deleted => fields.push(structural_field(
                    structural,
                    ChangeState::Deleted,
                    &original,
                    &original,
                )),
                ChangeState::Unchanged | ChangeState::Modified
                    if tracked.replaced.contains(&structural.name) =>
                {
                    fields.push(structural_field(
                        structural,
                        ChangeState::Deleted,
                        &original,
                        &original,
                    ));
                    fields.push(structural_field(
                        structural,
                        ChangeState::Added,
                        &Value::Null,
                        &current,
                    ));
                }
                ChangeState::Unchanged | ChangeState::Modified => fields.push(structural_field(
                    structural,
                    in_place_state(&original, &current),
                    &original,
                    &current,
                )),
                ChangeState::Detached => {}
            }
        }
        Ok(fields)
    }

    fn relationships(&self, entity_type: &str) -> AuditResult<Vec<RelationshipMeta>> {
        Ok(self.model.require(entity_type)?.relationships.clone())
    }

    fn tracked_entities_of_type(&self, entity_type: &str) -> AuditResult<Vec<EntityRef>> {
        self.model.require(entity_type)?;
        Ok(self
            .entities
            .iter()
            .filter(|(_, t)| t.entity_type == entity_type)
            .map(|(entity, _)| *entity)
            .collect())
    }

    fn primary_key(&self, entity: EntityRef) -> AuditResult<PrimaryKey> {
        let tracked = self.entry(entity)?;
        let meta = self.model.require(&tracked.entity_type)?;
        let missing = || AuditError::MissingPrimaryKey {
            entity_type: tracked.entity_type.clone(),
        };

        if meta.primary_key.is_empty() {
            return Err(missing());
        }

        meta.primary_key
            .iter()
            .map(|name| match tracked.current_value(name) {
                Value::Null => Err(missing()),
                value => Ok(KeyPart {
                    name: name.clone(),
                    value,
                }),
            })
            .collect()
    }
}
