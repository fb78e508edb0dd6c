//! Audit sink writing to the `audit_logs` table.

use boxoffice_core::audit::{AuditLog, AuditRecord};
use sqlx::PgPool;

/// Writes audit records on a detached task. Failures are logged and dropped.
#[derive(Debug, Clone)]
pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    /// Create a sink on `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AuditLog for PostgresAuditLog {
    fn record(&self, record: AuditRecord) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(action = %record.action, "No runtime available; audit record dropped");
            return;
        };
        let pool = self.pool.clone();
        handle.spawn(async move {
            let result = sqlx::query(
                r"
                INSERT INTO audit_logs (actor_id, action, target_id, details)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(record.actor)
            .bind(&record.action)
            .bind(&record.target)
            .bind(&record.details)
            .execute(&pool)
            .await;

            if let Err(e) = result {
                metrics::counter!("boxoffice_audit_failures_total").increment(1);
                tracing::warn!(
                    action = %record.action,
                    target = %record.target,
                    error = %e,
                    "Failed to write audit record"
                );
            }
        });
    }
}
