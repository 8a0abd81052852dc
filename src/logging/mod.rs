//! Logging infrastructure
//!
//! Tracing subscriber setup lives in `main.rs`; this module provides the
//! JSONL audit trail for operator-visible decisions.

pub mod audit;

pub use audit::{AuditEvent, AuditKind, AuditLogger};
