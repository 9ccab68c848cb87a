//! Value field differ
//!
//! Decides whether a single scalar field produces a [`FieldAudit`] and of
//! which kind, given the lifecycle state of whatever owns the field.

use serde_json::Value;

use super::node::FieldAudit;
use crate::models::ActorId;
use crate::tracking::{ChangeState, ScalarField};

/// Per-node settings for diffing scalar fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDiffer {
    /// Record the old value of fields of deleted owners
    pub record_deletions: bool,
    pub actor_id: Option<ActorId>,
}

impl FieldDiffer {
    pub fn new(record_deletions: bool, actor_id: Option<ActorId>) -> Self {
        Self {
            record_deletions,
            actor_id,
        }
    }

    /// Differ for value objects, which always keep their last known values
    pub fn for_value_object(self) -> Self {
        Self {
            record_deletions: true,
            ..self
        }
    }

    /// Diff one field
    ///
    /// - `Added` always yields the new value, defaults included.
    /// - `Deleted` yields the old value only when deletions are recorded.
    /// - `Modified` yields both values only when the field itself was
    ///   modified and the values differ.
    pub fn diff(
        &self,
        state: ChangeState,
        was_modified: bool,
        old_value: &Value,
        new_value: &Value,
    ) -> Option<FieldAudit> {
        let audit = match state {
            ChangeState::Added => FieldAudit::added(new_value.clone()),
            ChangeState::Deleted if self.record_deletions => FieldAudit::deleted(old_value.clone()),
            ChangeState::Modified if was_modified && old_value != new_value => {
                FieldAudit::modified(old_value.clone(), new_value.clone())
            }
            _ => return None,
        };

        Some(FieldAudit {
            actor_id: self.actor_id,
            ..audit
        })
    }

    /// Diff a tracked scalar field
    pub fn diff_scalar(&self, state: ChangeState, field: &ScalarField) -> Option<FieldAudit> {
        let audit = self.diff(state, field.was_modified, &field.original, &field.current);
        tracing::trace!(
            field = %field.name,
            state = %state,
            recorded = audit.is_some(),
            "Diffed scalar field"
        );
        audit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::node::FieldState;
    use serde_json::json;

    fn differ() -> FieldDiffer {
        FieldDiffer::new(false, None)
    }

    #[test]
    fn test_added_always_emitted() {
        let audit = differ()
            .diff(ChangeState::Added, false, &Value::Null, &json!(""))
            .unwrap();
        assert_eq!(audit.state, FieldState::Added);
        assert_eq!(audit.new_value, Some(json!("")));
        assert!(audit.old_value.is_none());
    }

    #[test]
    fn test_deleted_suppressed_for_entities() {
        assert!(differ()
            .diff(ChangeState::Deleted, false, &json!("x"), &json!("x"))
            .is_none());
    }

    #[test]
    fn test_deleted_recorded_for_value_objects() {
        let audit = differ()
            .for_value_object()
            .diff(ChangeState::Deleted, false, &json!("x"), &json!("x"))
            .unwrap();
        assert_eq!(audit.state, FieldState::Deleted);
        assert_eq!(audit.old_value, Some(json!("x")));
        assert!(audit.new_value.is_none());
    }

    #[test]
    fn test_modified_requires_flag() {
        assert!(differ()
            .diff(ChangeState::Modified, false, &json!(1), &json!(2))
            .is_none());

        let audit = differ()
            .diff(ChangeState::Modified, true, &json!(1), &json!(2))
            .unwrap();
        assert_eq!(audit.state, FieldState::Modified);
    }

    #[test]
    fn test_modified_equal_values_is_no_change() {
        assert!(differ()
            .diff(ChangeState::Modified, true, &json!("same"), &json!("same"))
            .is_none());
    }

    #[test]
    fn test_type_mismatch_reported_as_modified() {
        let audit = differ()
            .diff(ChangeState::Modified, true, &json!(1), &json!("1"))
            .unwrap();
        assert_eq!(audit.old_value, Some(json!(1)));
        assert_eq!(audit.new_value, Some(json!("1")));
    }

    #[test]
    fn test_unchanged_and_detached_produce_nothing() {
        for state in [ChangeState::Unchanged, ChangeState::Detached] {
            assert!(differ().diff(state, true, &json!(1), &json!(2)).is_none());
        }
    }

    #[test]
    fn test_actor_stamped() {
        let actor = ActorId::new();
        let audit = FieldDiffer::new(false, Some(actor))
            .diff(ChangeState::Added, false, &Value::Null, &json!(3))
            .unwrap();
        assert_eq!(audit.actor_id, Some(actor));
    }
}
