//! Commit-or-rollback for one unit of work.
//!
//! ```ignore
//! let mut tx = store.begin().await?;
//! let result = ledger.finalize(&mut *tx, order_id, now).await;
//! let finalized = transaction::finish(tx, result).await?;
//! ```
//!
//! Reads through the store's own handle (`TicketStore::order` and friends)
//! must not be issued while a transaction from the same store is open.

use boxoffice_core::error::TicketingError;
use boxoffice_core::store::StoreTransaction;

/// Commit `tx` if `result` is `Ok`, roll it back otherwise.
///
/// A failed commit replaces the result with the commit error. A failed
/// rollback is logged and the original error is returned.
///
/// # Errors
///
/// The operation's own error, or the commit error.
pub async fn finish<R>(
    tx: Box<dyn StoreTransaction>,
    result: Result<R, TicketingError>,
) -> Result<R, TicketingError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        },
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, cause = %err, "Rollback failed");
            }
            Err(err)
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boxoffice_core::store::{PointsTx, TicketStore};
    use boxoffice_core::types::{NewUser, UserId};
    use boxoffice_testing::{InMemoryTicketStore, test_epoch};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            id: UserId::new(),
            name: "Ana".into(),
            email: email.into(),
            created_at: test_epoch(),
        }
    }

    #[tokio::test]
    async fn ok_commits() {
        let store = InMemoryTicketStore::new();
        let mut tx = store.begin().await.unwrap();
        let result = tx.insert_user(new_user("a@example.com")).await.map_err(Into::into);
        let user = finish(tx, result).await.unwrap();

        assert!(store.user(user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn err_rolls_back() {
        let store = InMemoryTicketStore::new();
        let input = new_user("b@example.com");
        let id = input.id;

        let mut tx = store.begin().await.unwrap();
        tx.insert_user(input).await.unwrap();
        let result: Result<(), _> = Err(TicketingError::InvalidRequest("nope".into()));
        let err = finish(tx, result).await.unwrap_err();

        assert!(matches!(err, TicketingError::InvalidRequest(_)));
        assert!(store.user(id).await.unwrap().is_none());
    }
}
