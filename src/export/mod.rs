//! Export module for graph-audit
//!
//! Renders audit reports in machine-readable formats:
//! - JSON: compact or pretty, the canonical record shape
//! - YAML: for reading by hand

pub mod json;
pub mod yaml;

pub use json::{write_report_json, AuditReport, REPORT_SCHEMA_VERSION};
pub use yaml::write_report_yaml;
