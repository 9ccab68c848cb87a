//! CLI commands for producing audit records
//!
//! Runs the engine over the demo aggregate or a change-set document and
//! prints the resulting report.

use clap::Args;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::audit::{generate_summary, AuditEngine, AuditOptions, DeletedFieldPolicy};
use crate::config::{OutputFormat, Settings};
use crate::demo::{self, Scenario};
use crate::display::format_change_table;
use crate::error::{AuditError, AuditResult};
use crate::export::{write_report_json, write_report_yaml, AuditReport};
use crate::models::ActorId;
use crate::tracking::{ChangeSet, ChangeTracker, EntityRef};

/// Printed instead of a report when nothing changed
pub const NO_CHANGES: &str = "No changes detected.";

/// Report options shared by the audit commands
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Output format (defaults to the configured one)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compact JSON output
    #[arg(long)]
    pub compact: bool,

    /// Record every field of deleted entities, not only value objects
    #[arg(long)]
    pub all_deleted_fields: bool,

    /// Actor stamped on every field record
    #[arg(long, env = "GRAPH_AUDIT_ACTOR")]
    pub actor: Option<ActorId>,
}

impl ReportArgs {
    fn audit_options(&self, settings: &Settings) -> AuditOptions {
        let mut options = settings.audit_options();
        if self.all_deleted_fields {
            options.deleted_fields = DeletedFieldPolicy::All;
        }
        if self.actor.is_some() {
            options.actor_id = self.actor;
        }
        options
    }
}

/// Handle the demo command
pub fn handle_demo(settings: &Settings, scenario: Scenario, args: &ReportArgs) -> AuditResult<()> {
    let (tracker, root) = demo::run(scenario)?;
    audit_and_render(&tracker, root, settings, args)
}

/// Handle the audit command for a change-set document
pub fn handle_audit_file(settings: &Settings, file: &Path, args: &ReportArgs) -> AuditResult<()> {
    let change_set = ChangeSet::load(file)?;
    tracing::debug!(
        file = %file.display(),
        entities = change_set.entities.len(),
        "Loaded change set"
    );

    let (tracker, root) = change_set.into_tracker()?;
    audit_and_render(&tracker, root, settings, args)
}

fn audit_and_render<T: ChangeTracker + ?Sized>(
    tracker: &T,
    root: EntityRef,
    settings: &Settings,
    args: &ReportArgs,
) -> AuditResult<()> {
    let options = args.audit_options(settings);
    let record = AuditEngine::with_options(tracker, options).create_audit_log(root)?;
    let report = AuditReport::new(record, options.actor_id);

    let format = args.format.unwrap_or(settings.output_format);
    let pretty = settings.pretty && !args.compact;

    match &args.output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                AuditError::Io(format!("Failed to create file {}: {}", path.display(), e))
            })?;
            let mut writer = BufWriter::new(file);
            render(&report, format, pretty, &mut writer)?;
            writer.flush()?;
            println!("Audit report written to: {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            render(&report, format, pretty, &mut writer)?;
        }
    }

    Ok(())
}

/// Write a report in the requested format
pub fn render<W: Write>(
    report: &AuditReport,
    format: OutputFormat,
    pretty: bool,
    writer: &mut W,
) -> AuditResult<()> {
    let Some(record) = &report.record else {
        writeln!(writer, "{}", NO_CHANGES)?;
        return Ok(());
    };

    match format {
        OutputFormat::Json => write_report_json(report, writer, pretty)?,
        OutputFormat::Yaml => write_report_yaml(report, writer)?,
        OutputFormat::Table => writeln!(writer, "{}", format_change_table(Some(record)))?,
        OutputFormat::Summary => match generate_summary(record) {
            Some(summary) => writeln!(writer, "{}", summary)?,
            None => writeln!(writer, "{}", NO_CHANGES)?,
        },
    }

    Ok(())
}
