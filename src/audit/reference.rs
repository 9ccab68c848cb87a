//! Reference differ
//!
//! Foreign-key fields are not diffed as plain values. A changed foreign key
//! means one reference was severed and another one added, so it is recorded
//! as up to two [`ReferenceTransition`]s.

use serde_json::Value;

use super::node::ReferenceTransition;

/// Whether a key value identifies nothing (null, empty string or nil UUID)
pub fn is_empty_identity(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            s.is_empty() || uuid::Uuid::parse_str(s).map(|u| u.is_nil()).unwrap_or(false)
        }
        _ => false,
    }
}

/// Diff a foreign-key field
///
/// Returns `None` when the field was not modified or nothing changed.
pub fn diff_reference(
    was_modified: bool,
    old_target: &Value,
    new_target: &Value,
) -> Option<Vec<ReferenceTransition>> {
    if !was_modified || old_target == new_target {
        return None;
    }

    let mut transitions = Vec::with_capacity(2);
    if !is_empty_identity(old_target) {
        transitions.push(ReferenceTransition::severed(old_target.clone()));
    }
    if !is_empty_identity(new_target) {
        transitions.push(ReferenceTransition::added(new_target.clone()));
    }

    if transitions.is_empty() {
        None
    } else {
        Some(transitions)
    }
}
