//! Display formatting for terminal output
//!
//! Renders audit records as tables for people reading them in a terminal.

pub mod changes;

pub use changes::{format_change_lines, format_change_table};
