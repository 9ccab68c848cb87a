//! Configuration module for graph-audit
//!
//! This module provides configuration management including:
//! - Config directory resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::AuditPaths;
pub use settings::{OutputFormat, Settings};
