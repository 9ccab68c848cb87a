//! Core data models for graph-audit
//!
//! Identity types shared by the audit engine and its callers.

pub mod ids;

pub use ids::ActorId;
