//! Human-readable summaries of audit records
//!
//! Flattens the audit tree into one line per change, addressed by a dotted
//! path from the root (`InnerEntities[3].Name`, `ValueObject.Price`).

use serde_json::Value;

use super::node::{AuditNode, AuditState, AuditValue};

/// One flattened change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLine {
    /// Dotted path from the root, empty for the root itself
    pub path: String,
    pub state: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl ChangeLine {
    /// Path for display, `(root)` for the root node
    pub fn display_path(&self) -> &str {
        if self.path.is_empty() {
            "(root)"
        } else {
            &self.path
        }
    }

    /// Describe this change in one phrase
    pub fn describe(&self) -> String {
        match (&self.old_value, &self.new_value) {
            (Some(old), Some(new)) => format!("{}: {} -> {}", self.display_path(), old, new),
            (None, Some(new)) => format!("{}: (added) -> {}", self.display_path(), new),
            (Some(old), None) => format!("{}: {} -> (removed)", self.display_path(), old),
            (None, None) => format!("{}: {}", self.display_path(), self.state),
        }
    }
}

/// Flatten an audit record into change lines, depth first
pub fn flatten(node: &AuditNode) -> Vec<ChangeLine> {
    let mut lines = Vec::new();
    flatten_into(node, "", &mut lines);
    lines
}

fn flatten_into(node: &AuditNode, path: &str, lines: &mut Vec<ChangeLine>) {
    if let Some(state) = node.state() {
        lines.push(ChangeLine {
            path: path.to_string(),
            state: state.to_string(),
            old_value: None,
            new_value: None,
        });
    }

    for (name, value) in node.entries() {
        let child_path = join(path, name);
        match value {
            AuditValue::Key(_) => {}
            AuditValue::Field(field) => lines.push(ChangeLine {
                path: child_path,
                state: field.state.to_string(),
                old_value: field.old_value.as_ref().map(format_value),
                new_value: field.new_value.as_ref().map(format_value),
            }),
            AuditValue::References(refs) => {
                for transition in refs {
                    let id = Some(format_value(&transition.id));
                    let severed = transition.state == AuditState::ReferenceSevered;
                    lines.push(ChangeLine {
                        path: child_path.clone(),
                        state: transition.state.to_string(),
                        old_value: if severed { id.clone() } else { None },
                        new_value: if severed { None } else { id },
                    });
                }
            }
            AuditValue::Node(child) => flatten_into(child, &child_path, lines),
            AuditValue::Nodes(children) => {
                for child in children {
                    let item_path = format!("{}[{}]", child_path, key_label(child));
                    flatten_into(child, &item_path, lines);
                }
            }
        }
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

/// Key parts of a node joined with commas, strings unquoted
fn key_label(node: &AuditNode) -> String {
    node.entries()
        .iter()
        .filter_map(|(_, value)| value.as_key())
        .map(|key| match key {
            Value::String(s) => s.clone(),
            other => format_value(other),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Generate a one-line summary of every change in a record
///
/// Returns `None` when the record holds no changes.
pub fn generate_summary(node: &AuditNode) -> Option<String> {
    let changes: Vec<String> = flatten(node).iter().map(ChangeLine::describe).collect();
    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

/// Format a JSON value for human-readable display
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            // Truncate long strings
            if s.chars().count() > 50 {
                let head: String = s.chars().take(47).collect();
                format!("\"{}...\"", head)
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::node::{AuditState, FieldAudit, ReferenceTransition};
    use crate::tracking::KeyPart;
    use serde_json::json;

    fn key(value: Value) -> Vec<KeyPart> {
        vec![KeyPart {
            name: "Id".into(),
            value,
        }]
    }

    fn sample() -> AuditNode {
        let mut root = AuditNode::with_key(AuditState::Modified, &key(json!(1)));
        root.insert(
            "Name",
            AuditValue::Field(FieldAudit::modified(json!("Initial"), json!("Changed"))),
        );

        let mut value_object = AuditNode::structural();
        value_object.insert(
            "Price",
            AuditValue::Field(FieldAudit::modified(json!(1), json!(2))),
        );
        root.insert("ValueObject", AuditValue::Node(value_object));

        let mut child = AuditNode::with_key(AuditState::Added, &key(json!("abc")));
        child.insert("Quantity", AuditValue::Field(FieldAudit::added(json!(3))));
        root.insert("InnerEntities", AuditValue::Nodes(vec![child]));

        root.insert(
            "OwnerId",
            AuditValue::References(vec![
                ReferenceTransition::severed(json!(7)),
                ReferenceTransition::added(json!(8)),
            ]),
        );
        root
    }

    #[test]
    fn test_flatten_paths() {
        let lines = flatten(&sample());
        let paths: Vec<&str> = lines.iter().map(|l| l.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "",
                "Name",
                "ValueObject.Price",
                "InnerEntities[abc]",
                "InnerEntities[abc].Quantity",
                "OwnerId",
                "OwnerId",
            ]
        );
    }

    #[test]
    fn test_flatten_values() {
        let lines = flatten(&sample());
        assert_eq!(lines[0].state, "Modified");
        assert_eq!(lines[0].display_path(), "(root)");

        assert_eq!(lines[1].old_value.as_deref(), Some("\"Initial\""));
        assert_eq!(lines[1].new_value.as_deref(), Some("\"Changed\""));

        assert_eq!(lines[5].state, "ReferenceSevered");
        assert_eq!(lines[5].old_value.as_deref(), Some("7"));
        assert!(lines[5].new_value.is_none());
        assert_eq!(lines[6].new_value.as_deref(), Some("8"));
    }

    #[test]
    fn test_generate_summary() {
        let summary = generate_summary(&sample()).unwrap();
        assert!(summary.starts_with("(root): Modified"));
        assert!(summary.contains("Name: \"Initial\" -> \"Changed\""));
        assert!(summary.contains("InnerEntities[abc].Quantity: (added) -> 3"));
        assert!(summary.contains("OwnerId: 7 -> (removed)"));
    }

    #[test]
    fn test_empty_structural_has_no_summary() {
        assert!(generate_summary(&AuditNode::structural()).is_none());
    }

    #[test]
    fn test_composite_key_label() {
        let parts = vec![
            KeyPart {
                name: "TestEntityId".into(),
                value: json!("a"),
            },
            KeyPart {
                name: "OtherEntityId".into(),
                value: json!(2),
            },
        ];
        let node = AuditNode::with_key(AuditState::Deleted, &parts);
        assert_eq!(key_label(&node), "a,2");
    }

    #[test]
    fn test_long_string_truncation() {
        let formatted = format_value(&json!("a".repeat(100)));
        assert!(formatted.ends_with("...\""));
        assert_eq!(formatted.len(), 47 + 5);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!(null)), "null");
        assert_eq!(format_value(&json!(true)), "true");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!("test")), "\"test\"");
        assert_eq!(format_value(&json!([1, 2, 3])), "[3 items]");
        assert_eq!(format_value(&json!({"a": 1, "b": 2})), "{2 fields}");
    }
}
