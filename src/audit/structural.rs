//! Structural (value-object) differ
//!
//! Embedded value objects have no lifecycle of their own. Their node only
//! exists when one of their scalars or nested value objects changed, and it
//! never carries an `AuditState` marker.
//!
//! Trackers report a wholesale replacement of a value object as the old
//! value deleted plus the new value added. Those pairs are reconciled into a
//! single modification first, so only fields whose values actually differ
//! show up.

use super::field::FieldDiffer;
use super::node::{AuditNode, AuditValue};
use crate::tracking::{ChangeState, ScalarField, StructuralField};

/// Diff all structural fields of one entity
pub fn diff_structurals(
    differ: FieldDiffer,
    fields: Vec<StructuralField>,
) -> Vec<(String, AuditNode)> {
    let differ = differ.for_value_object();
    reconcile(fields)
        .into_iter()
        .filter_map(|field| diff_structural(&differ, &field).map(|node| (field.name, node)))
        .collect()
}

/// Diff one structural field, recursing into nested value objects
pub fn diff_structural(differ: &FieldDiffer, field: &StructuralField) -> Option<AuditNode> {
    let mut node = AuditNode::structural();
    let mut changed = false;

    for scalar in &field.scalar_fields {
        if let Some(audit) = differ.diff_scalar(field.state, scalar) {
            node.insert(scalar.name.clone(), AuditValue::Field(audit));
            changed = true;
        }
    }

    for nested in &field.nested {
        if let Some(child) = diff_structural(differ, nested) {
            node.insert(nested.name.clone(), AuditValue::Node(child));
            changed = true;
        }
    }

    changed.then_some(node)
}

/// Merge delete+add pairs reported under the same name into modifications
///
/// Order of first appearance is kept.
pub fn reconcile(fields: Vec<StructuralField>) -> Vec<StructuralField> {
    let mut groups: Vec<Vec<StructuralField>> = Vec::new();
    for field in fields {
        match groups.iter_mut().find(|g| g[0].name == field.name) {
            Some(group) => group.push(field),
            None => groups.push(vec![field]),
        }
    }

    groups.into_iter().filter_map(merge_group).collect()
}

fn merge_group(mut group: Vec<StructuralField>) -> Option<StructuralField> {
    if group.len() == 2 {
        let second = group.pop()?;
        let first = group.pop()?;
        return Some(match (first.state, second.state) {
            (ChangeState::Deleted, ChangeState::Added) => replacement(first, second),
            (ChangeState::Added, ChangeState::Deleted) => replacement(second, first),
            _ => {
                tracing::warn!(
                    structural = %second.name,
                    "Conflicting structural reports, keeping the last one"
                );
                second
            }
        });
    }

    if group.len() > 2 {
        tracing::warn!(
            structural = %group[0].name,
            reports = group.len(),
            "Conflicting structural reports, keeping the last one"
        );
    }
    group.pop()
}

fn replacement(old: StructuralField, new: StructuralField) -> StructuralField {
    let mut scalar_fields: Vec<ScalarField> = new
        .scalar_fields
        .into_iter()
        .map(|current| {
            let original = old
                .scalar_fields
                .iter()
                .find(|s| s.name == current.name)
                .map(|s| s.original.clone())
                .unwrap_or_default();
            ScalarField {
                was_modified: true,
                original,
                ..current
            }
        })
        .collect();

    for removed in old.scalar_fields {
        if !scalar_fields.iter().any(|s| s.name == removed.name) {
            scalar_fields.push(ScalarField {
                was_modified: true,
                current: serde_json::Value::Null,
                ..removed
            });
        }
    }

    let mut old_nested = old.nested;
    let mut nested: Vec<StructuralField> = new
        .nested
        .into_iter()
        .map(
            |current| match old_nested.iter().position(|n| n.name == current.name) {
                Some(index) => replacement(old_nested.remove(index), current),
                None => current,
            },
        )
        .collect();
    nested.extend(old_nested);

    StructuralField {
        name: new.name,
        state: ChangeState::Modified,
        scalar_fields,
        nested,
    }
}
