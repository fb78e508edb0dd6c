//! Audit sink that writes to the tracing pipeline.
//!
//! Used when no database sink is configured, and handy in development where
//! the audit trail is read from the logs.

use boxoffice_core::audit::{AuditLog, AuditRecord};

/// Emits each record as an `info` event on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, record: AuditRecord) {
        tracing::info!(
            target: "audit",
            actor = ?record.actor,
            action = %record.action,
            target_id = %record.target,
            details = %record.details,
            "Audit"
        );
    }
}
