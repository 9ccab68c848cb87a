//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the audit engine.

pub mod audit;

pub use audit::{handle_audit_file, handle_demo, render, ReportArgs, NO_CHANGES};
