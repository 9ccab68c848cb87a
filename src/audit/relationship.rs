//! Relationship auditing
//!
//! Resolves which tracked entities sit under a parent through one
//! relationship and audits each of them according to the relationship's
//! classification:
//!
//! - ownership: full entity audit, recursing into the child
//! - anything else targeting an aggregate root: identity plus
//!   `ReferenceAdded`/`ReferenceSevered`, no recursion
//! - anything else: row identity plus lifecycle state

use serde_json::Value;

use super::engine::Traversal;
use super::node::{AuditNode, AuditState, AuditValue};
use super::reference::is_empty_identity;
use crate::error::{AuditError, AuditResult};
use crate::tracking::{
    ChangeState, ChangeTracker, Classification, EntityKind, EntityRef, KeyPart, RelationshipMeta,
};

/// How a candidate's foreign key compares to the parent key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyMatch {
    current: bool,
    original: bool,
}

fn validate(
    relationship: &RelationshipMeta,
    parent_type: &str,
    parent_key: &[KeyPart],
) -> AuditResult<()> {
    if relationship.target_type.is_empty() {
        return Err(AuditError::relationship_contract(
            parent_type,
            &relationship.name,
            "has no target type",
        ));
    }
    if relationship.foreign_key.is_empty() {
        return Err(AuditError::relationship_contract(
            parent_type,
            &relationship.name,
            "declares no foreign key",
        ));
    }
    if relationship.foreign_key.len() != parent_key.len() {
        return Err(AuditError::relationship_contract(
            parent_type,
            &relationship.name,
            format!(
                "declares {} foreign key fields for a key of {} parts",
                relationship.foreign_key.len(),
                parent_key.len()
            ),
        ));
    }
    Ok(())
}

fn matches_key(value: &Value, part: &KeyPart) -> bool {
    !is_empty_identity(value) && *value == part.value
}

impl<'a, T: ChangeTracker + ?Sized> Traversal<'a, T> {
    /// Audit the entities reachable from a parent through `relationship`
    pub(crate) fn audit_relationship(
        &mut self,
        relationship: &RelationshipMeta,
        parent_type: &str,
        parent_key: &[KeyPart],
    ) -> AuditResult<Option<AuditValue>> {
        validate(relationship, parent_type, parent_key)?;

        let target_kind = self.tracker.entity_kind(&relationship.target_type)?;
        let candidates = self
            .tracker
            .tracked_entities_of_type(&relationship.target_type)?;

        tracing::debug!(
            relationship = %relationship.name,
            target_type = %relationship.target_type,
            classification = ?relationship.classification,
            candidates = candidates.len(),
            "Resolving relationship"
        );

        let mut nodes = Vec::new();
        for candidate in candidates {
            if !self.belongs_to_parent(relationship, candidate, parent_key)? {
                continue;
            }

            let node = match relationship.classification {
                Classification::Ownership => self.audit_entry(candidate, false)?,
                _ if target_kind == EntityKind::AggregateRoot => {
                    self.audit_reference_only(candidate, relationship, parent_key)?
                }
                _ => self.audit_association(candidate)?,
            };
            nodes.extend(node);
        }

        Ok(match nodes.len() {
            0 => None,
            1 if !relationship.is_collection => nodes.pop().map(AuditValue::Node),
            _ => Some(AuditValue::Nodes(nodes)),
        })
    }

    /// Audit an independent aggregate root reached through a reference
    ///
    /// Only the identity and the reference transition are recorded.
    pub(crate) fn audit_reference_only(
        &mut self,
        entity: EntityRef,
        relationship: &RelationshipMeta,
        parent_key: &[KeyPart],
    ) -> AuditResult<Option<AuditNode>> {
        if self.is_visited(entity) {
            return Ok(None);
        }
        let state = self.tracker.state(entity)?;
        if matches!(state, ChangeState::Detached | ChangeState::Unchanged) {
            return Ok(None);
        }
        self.visit(entity);

        let transition = match state {
            ChangeState::Added => AuditState::ReferenceAdded,
            ChangeState::Deleted => AuditState::ReferenceSevered,
            ChangeState::Modified => match self.key_match(relationship, entity, parent_key)? {
                Some(KeyMatch { current: true, .. }) => AuditState::ReferenceAdded,
                _ => AuditState::ReferenceSevered,
            },
            _ => AuditState::Detached,
        };

        let key = self.tracker.primary_key(entity)?;
        tracing::debug!(
            entity = %entity,
            relationship = %relationship.name,
            transition = %transition,
            "Audited reference"
        );
        Ok(Some(AuditNode::with_key(transition, &key)))
    }

    /// Audit a many-to-many join row
    pub(crate) fn audit_association(&mut self, entity: EntityRef) -> AuditResult<Option<AuditNode>> {
        if self.is_visited(entity) {
            return Ok(None);
        }
        let state = self.tracker.state(entity)?;
        if matches!(state, ChangeState::Detached | ChangeState::Unchanged) {
            return Ok(None);
        }
        self.visit(entity);

        let key = self.tracker.primary_key(entity)?;
        Ok(Some(AuditNode::with_key(AuditState::from(state), &key)))
    }

    /// Whether a candidate sits under the parent
    ///
    /// Current foreign keys always count. For non-ownership relationships
    /// the original foreign key counts too, so entities moved away from the
    /// parent are still reported (as severed) under it.
    fn belongs_to_parent(
        &self,
        relationship: &RelationshipMeta,
        candidate: EntityRef,
        parent_key: &[KeyPart],
    ) -> AuditResult<bool> {
        if self.tracker.state(candidate)? == ChangeState::Detached {
            return Ok(false);
        }

        Ok(match self.key_match(relationship, candidate, parent_key)? {
            Some(m) => {
                m.current
                    || (relationship.classification != Classification::Ownership && m.original)
            }
            None => false,
        })
    }

    /// Compare a candidate's foreign key to the parent key, part by part
    ///
    /// `None` when the candidate lacks one of the foreign key fields; such
    /// malformed candidates are skipped rather than guessed at.
    fn key_match(
        &self,
        relationship: &RelationshipMeta,
        candidate: EntityRef,
        parent_key: &[KeyPart],
    ) -> AuditResult<Option<KeyMatch>> {
        let fields = self.tracker.scalar_fields(candidate)?;
        let mut result = KeyMatch {
            current: true,
            original: true,
        };

        for (name, part) in relationship.foreign_key.iter().zip(parent_key) {
            let Some(field) = fields.iter().find(|f| &f.name == name) else {
                tracing::warn!(
                    relationship = %relationship.name,
                    field = %name,
                    candidate = %candidate,
                    "Foreign key field missing on candidate, skipping it"
                );
                return Ok(None);
            };
            result.current &= matches_key(&field.current, part);
            result.original &= matches_key(&field.original, part);
        }

        Ok(Some(result))
    }
}
