//! Tally Audit — change-tracking audit log.
//!
//! Callers hand over before/after [`SnapshotValue`]s; the service redacts
//! sensitive keys, breaks reference cycles, computes the field diff and
//! appends the entry through an [`AuditLogRepository`](tally_core::repository::AuditLogRepository).

pub mod config;
pub mod diff;
pub mod entry;
pub mod error;
pub mod sanitize;
pub mod service;
pub mod snapshot;

pub use config::AuditConfig;
pub use entry::{AuditContext, CreateAuditLog};
pub use error::AuditError;
pub use service::AuditLogService;
pub use snapshot::{DocumentRef, SnapshotValue};
