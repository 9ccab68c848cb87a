//! Change table display formatting
//!
//! Formats flattened audit records for terminal output.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::audit::{flatten, AuditNode, ChangeLine};

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Old")]
    old: String,
    #[tabled(rename = "New")]
    new: String,
}

impl From<&ChangeLine> for ChangeRow {
    fn from(line: &ChangeLine) -> Self {
        Self {
            path: line.display_path().to_string(),
            state: line.state.clone(),
            old: line.old_value.clone().unwrap_or_default(),
            new: line.new_value.clone().unwrap_or_default(),
        }
    }
}

/// Format change lines as a table
pub fn format_change_lines(lines: &[ChangeLine]) -> String {
    if lines.is_empty() {
        return "No changes detected.".to_string();
    }

    let rows: Vec<ChangeRow> = lines.iter().map(ChangeRow::from).collect();
    let mut output = Table::new(rows).with(Style::sharp()).to_string();

    output.push('\n');
    output.push_str(&format!("{} change(s)", lines.len()));
    output
}

/// Format an audit record as a change table
pub fn format_change_table(record: Option<&AuditNode>) -> String {
    match record {
        Some(node) => format_change_lines(&flatten(node)),
        None => format_change_lines(&[]),
    }
}
