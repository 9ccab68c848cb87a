//! Audit record construction
//!
//! Walks an aggregate's pending changes through a [`ChangeTracker`] and
//! produces one hierarchical [`AuditNode`] describing what changed.
//!
//! # Architecture
//!
//! - `node`: the record types (`AuditNode`, `AuditValue`, `FieldAudit`,
//!   `ReferenceTransition`) and their JSON shape.
//! - `field`, `structural`, `reference`: leaf differs for scalar fields,
//!   embedded value objects and foreign keys.
//! - `entity`, `relationship`: per-entity node building and relationship
//!   resolution, implemented on the per-call traversal context.
//! - `engine`: [`AuditEngine`], the single entry point.
//! - `summary`: flattening a record into human-readable change lines.
//!
//! # Example
//!
//! ```rust,ignore
//! use graph_audit::audit::AuditEngine;
//!
//! let engine = AuditEngine::new(&tracker);
//! if let Some(record) = engine.create_audit_log(root)? {
//!     println!("{}", serde_json::to_string_pretty(&record)?);
//! }
//! ```
//!
//! [`ChangeTracker`]: crate::tracking::ChangeTracker

mod engine;
mod entity;
mod field;
mod node;
mod reference;
mod relationship;
mod structural;
pub mod summary;

pub use engine::{create_audit_log, AuditEngine, AuditOptions, DeletedFieldPolicy};
pub use field::FieldDiffer;
pub use node::{
    AuditNode, AuditState, AuditValue, FieldAudit, FieldState, ReferenceTransition,
    AUDIT_STATE_KEY,
};
pub use reference::{diff_reference, is_empty_identity};
pub use structural::{diff_structural, diff_structurals};
pub use summary::{flatten, generate_summary, ChangeLine};
