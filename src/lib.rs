//! graph-audit - structured audit records for aggregate changes
//!
//! Given the root of an aggregate and a change-tracking provider holding its
//! pending changes, the engine walks the object graph and produces a single
//! hierarchical audit record: scalar field diffs, owned child entities,
//! embedded value objects, foreign-key transitions and many-to-many link
//! changes. Independent aggregate roots are only referenced, never expanded.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `tracking`: the `ChangeTracker` provider interface, entity metadata,
//!   an in-memory tracker and change-set documents
//! - `audit`: the traversal engine and the audit record types
//! - `models`: shared identity types
//! - `config`: configuration and path management
//! - `error`: custom error types
//! - `export`, `display`: report rendering
//! - `demo`: a sample aggregate with ready-made change scenarios
//! - `cli`: command handlers for the binary
//!
//! # Example
//!
//! ```rust,ignore
//! use graph_audit::audit::AuditEngine;
//! use graph_audit::demo::{self, Scenario};
//!
//! let (tracker, root) = demo::run(Scenario::Basic)?;
//! let record = AuditEngine::new(&tracker).create_audit_log(root)?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod demo;
pub mod display;
pub mod error;
pub mod export;
pub mod models;
pub mod tracking;

pub use audit::{create_audit_log, AuditEngine, AuditNode, AuditOptions};
pub use error::{AuditError, AuditResult};
pub use tracking::{ChangeTracker, EntityRef, InMemoryTracker};
