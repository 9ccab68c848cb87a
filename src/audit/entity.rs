//! Entity audit builder
//!
//! Produces the node for one entity inside its aggregate: echoed key,
//! scalar diffs, foreign-key transitions, structural diffs and the results
//! of every relationship declared on its type.

use super::engine::Traversal;
use super::node::{AuditNode, AuditState, AuditValue};
use super::reference::diff_reference;
use super::structural::diff_structurals;
use crate::error::AuditResult;
use crate::tracking::{ChangeState, ChangeTracker, EntityRef};

impl<'a, T: ChangeTracker + ?Sized> Traversal<'a, T> {
    /// Audit one entity
    ///
    /// Returns `None` for entities already visited in this traversal,
    /// detached entities, unchanged non-root entities and any modified or
    /// unchanged entity whose node would hold nothing but its key. Added and
    /// deleted entities are always emitted, since their state is the change.
    pub(crate) fn audit_entry(
        &mut self,
        entity: EntityRef,
        is_root: bool,
    ) -> AuditResult<Option<AuditNode>> {
        if self.is_visited(entity) {
            tracing::trace!(entity = %entity, "Already visited");
            return Ok(None);
        }

        let state = self.tracker.state(entity)?;
        if state == ChangeState::Detached || (state == ChangeState::Unchanged && !is_root) {
            return Ok(None);
        }
        self.visit(entity);

        let entity_type = self.tracker.entity_type(entity)?;
        let kind = self.tracker.entity_kind(&entity_type)?;
        let key = self.tracker.primary_key(entity)?;
        let differ = self.field_differ(kind);

        tracing::debug!(
            entity = %entity,
            entity_type = %entity_type,
            state = %state,
            "Auditing entity"
        );

        let mut node = AuditNode::with_key(AuditState::from(state), &key);
        let mut changed = matches!(state, ChangeState::Added | ChangeState::Deleted);

        for field in self.tracker.scalar_fields(entity)? {
            if field.is_primary_key {
                continue;
            }

            let value = if field.is_foreign_key {
                diff_reference(field.was_modified, &field.original, &field.current)
                    .map(AuditValue::References)
            } else {
                differ.diff_scalar(state, &field).map(AuditValue::Field)
            };

            if let Some(value) = value {
                node.insert(field.name, value);
                changed = true;
            }
        }

        for (name, structural) in diff_structurals(differ, self.tracker.structural_fields(entity)?)
        {
            node.insert(name, AuditValue::Node(structural));
            changed = true;
        }

        for relationship in self.tracker.relationships(&entity_type)? {
            if let Some(value) = self.audit_relationship(&relationship, &entity_type, &key)? {
                node.insert(relationship.name, value);
                changed = true;
            }
        }

        if !changed {
            tracing::debug!(entity = %entity, entity_type = %entity_type, "No net change");
            return Ok(None);
        }

        Ok(Some(node))
    }
}
