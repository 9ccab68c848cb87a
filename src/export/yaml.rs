//! YAML Export functionality
//!
//! Writes audit reports as YAML for people reviewing them by hand.

use std::io::Write;

use crate::error::AuditResult;
use crate::export::json::AuditReport;

/// Write a report as YAML
pub fn write_report_yaml<W: Write>(report: &AuditReport, writer: &mut W) -> AuditResult<()> {
    // Add a header comment
    writeln!(writer, "# graph-audit report")?;
    writeln!(writer, "# Generated: {}", report.generated_at)?;
    writeln!(writer, "# App Version: {}", report.app_version)?;
    writeln!(writer)?;

    serde_yaml::to_writer(writer, report)?;
    Ok(())
}
