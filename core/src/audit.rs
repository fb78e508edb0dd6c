//! Fire-and-forget audit trail.
//!
//! The audit sink is an external collaborator. Recording is synchronous from
//! the caller's point of view and infallible: sinks that do I/O must detach
//! it and swallow (log) their own failures, so an audit problem can never
//! fail the operation that triggered it.

use serde::Serialize;
use uuid::Uuid;

/// One audit entry: who did what to which target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    /// Acting user, or `None` for system actors such as the sweeper.
    pub actor: Option<Uuid>,
    /// Action name, e.g. `checkout.initiated`.
    pub action: String,
    /// Identifier of the affected entity.
    pub target: String,
    /// Free-form human readable details.
    pub details: String,
}

impl AuditRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(
        actor: Option<Uuid>,
        action: impl Into<String>,
        target: impl ToString,
        details: impl Into<String>,
    ) -> Self {
        Self {
            actor,
            action: action.into(),
            target: target.to_string(),
            details: details.into(),
        }
    }
}

/// Audit sink.
pub trait AuditLog: Send + Sync {
    /// Record an entry. Must not block on I/O and must not fail.
    fn record(&self, record: AuditRecord);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditLog;

impl AuditLog for NoopAuditLog {
    fn record(&self, _record: AuditRecord) {}
}
