use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use graph_audit::cli::{handle_audit_file, handle_demo, ReportArgs};
use graph_audit::config::{paths::AuditPaths, settings::Settings};
use graph_audit::demo::Scenario;

#[derive(Parser)]
#[command(
    name = "graph-audit",
    author = "Kaylee Beyene",
    version,
    about = "Structured audit records for an aggregate's pending changes",
    long_about = "graph-audit walks the pending changes of an aggregate's object graph \
                  and produces one hierarchical audit record: field diffs, owned child \
                  changes, value-object changes and reference transitions."
)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit the built-in sample aggregate
    Demo {
        /// Which changes to apply before auditing
        #[arg(short, long, value_enum, default_value_t = Scenario::Basic)]
        scenario: Scenario,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Audit the root of a change-set document
    Audit {
        /// Path to the change-set JSON file
        file: PathBuf,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Write the default configuration file
    Init,

    /// Show current configuration and paths
    Config,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("graph_audit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Initialize paths and settings
    let paths = AuditPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Some(Commands::Demo { scenario, report }) => {
            handle_demo(&settings, scenario, &report)?;
        }
        Some(Commands::Audit { file, report }) => {
            handle_audit_file(&settings, &file, &report)?;
        }
        Some(Commands::Init) => {
            println!("Initializing graph-audit at: {}", paths.base_dir().display());
            settings.save(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Edit {} to change the defaults.", paths.settings_file().display());
        }
        Some(Commands::Config) => {
            println!("graph-audit Configuration");
            println!("=========================");
            println!("Config directory: {}", paths.base_dir().display());
            println!("Settings file:    {}", paths.settings_file().display());
            println!("Initialized:      {}", paths.is_initialized());
            println!();
            println!("Settings:");
            println!("  Deleted fields: {:?}", settings.deleted_fields);
            println!("  Output format:  {}", settings.output_format);
            println!("  Pretty JSON:    {}", settings.pretty);
            match settings.actor_id {
                Some(actor) => println!("  Actor:          {}", actor.as_uuid()),
                None => println!("  Actor:          (none)"),
            }
        }
        None => {
            println!("graph-audit - audit records for aggregate changes");
            println!();
            println!("Run 'graph-audit --help' for usage information.");
            println!("Run 'graph-audit demo' to audit the sample aggregate.");
        }
    }

    Ok(())
}
