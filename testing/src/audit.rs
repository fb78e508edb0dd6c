//! Audit sink that keeps records in memory for assertions.

use boxoffice_core::audit::{AuditLog, AuditRecord};
use std::sync::{Arc, Mutex, PoisonError};

/// Collects every audit record it is given.
#[derive(Debug, Clone, Default)]
pub struct RecordingAuditLog {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl RecordingAuditLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in order.
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Actions recorded so far, in order.
    #[must_use]
    pub fn actions(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.action).collect()
    }
}

impl AuditLog for RecordingAuditLog {
    fn record(&self, record: AuditRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}
