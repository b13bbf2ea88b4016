//! Audit trail of lifecycle events.

mod audit_trail;

pub use audit_trail::{AuditEntry, AuditTrail};
