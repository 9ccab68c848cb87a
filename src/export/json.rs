//! JSON Export functionality
//!
//! Wraps an audit record in a timestamped report and writes it as JSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::audit::AuditNode;
use crate::error::AuditResult;
use crate::models::ActorId;

/// Current report schema version
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Timestamped wrapper around one audit record
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    /// Schema version for compatibility checking
    pub schema_version: String,

    /// When the record was produced
    pub generated_at: DateTime<Utc>,

    /// Application version that produced the report
    pub app_version: String,

    /// Who made the changes, when the caller knows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<ActorId>,

    /// The audit record, `null` when nothing changed
    pub record: Option<AuditNode>,
}

impl AuditReport {
    /// Create a report stamped with the current time
    pub fn new(record: Option<AuditNode>, actor_id: Option<ActorId>) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            actor_id,
            record,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.record.is_some()
    }
}

/// Write a report as JSON
pub fn write_report_json<W: Write>(
    report: &AuditReport,
    writer: &mut W,
    pretty: bool,
) -> AuditResult<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, report)?;
    } else {
        serde_json::to_writer(&mut *writer, report)?;
    }
    writeln!(writer)?;
    Ok(())
}
