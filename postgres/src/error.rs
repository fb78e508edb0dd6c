//! Mapping sqlx failures onto [`StoreError`].

use boxoffice_core::error::StoreError;

/// SQLSTATE codes that mean "try the whole transaction again".
const TRANSIENT_SQLSTATES: &[&str] = &[
    "55P03", // lock_not_available (lock_timeout)
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "57014", // query_canceled (statement_timeout)
];

/// Classify a sqlx error as transient, corrupt or fatal.
#[must_use]
pub fn classify(err: sqlx::Error) -> StoreError {
    let transient = match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            return StoreError::Conflict(db.message().to_string());
        },
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| TRANSIENT_SQLSTATES.iter().any(|s| *s == code)),
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_) => {
            return StoreError::Corrupt(err.to_string());
        },
        _ => false,
    };

    if transient {
        metrics::counter!("boxoffice_store_transient_errors_total").increment(1);
        tracing::debug!(error = %err, "Transient database failure");
        StoreError::Transient(err.to_string())
    } else {
        StoreError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeouts_are_transient() {
        assert!(classify(sqlx::Error::PoolTimedOut).is_transient());
        assert!(classify(sqlx::Error::PoolClosed).is_transient());
    }

    #[test]
    fn missing_rows_are_not_transient() {
        assert!(!classify(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn missing_columns_are_corrupt() {
        let err = classify(sqlx::Error::ColumnNotFound("price_cents".into()));
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
