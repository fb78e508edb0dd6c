//! Reservation allocator.
//!
//! Selects units for a category under the store's exclusive row locks. The
//! allocator only selects; linking the units to an order is the caller's
//! write, made in the same transaction.
//!
//! # Locking
//!
//! The selection is `ORDER BY id LIMIT n FOR UPDATE` (or the store's
//! equivalent). When a competing transaction holds some of the candidate
//! rows, this one waits, and when the competitor commits those rows are
//! re-checked and dropped if no longer available. The `LIMIT` was already
//! applied, so the first pass can come back short even though other free
//! units exist. A short first pass is therefore re-read once with a fresh
//! snapshot before reporting [`TicketingError::InsufficientStock`]. Rows
//! already locked by this transaction stay locked and are returned again.

use boxoffice_core::error::TicketingError;
use boxoffice_core::store::InventoryTx;
use boxoffice_core::types::{EventId, TicketUnit};

/// Claim exactly `quantity` available units of `category`, oldest first.
///
/// # Errors
///
/// - [`TicketingError::InvalidRequest`] for a zero quantity
/// - [`TicketingError::InsufficientStock`] if fewer units are available;
///   the caller must abort the transaction
/// - [`TicketingError::TransientStoreFailure`] if the lock wait timed out
pub async fn claim<T>(
    tx: &mut T,
    event_id: EventId,
    category: &str,
    quantity: u32,
) -> Result<Vec<TicketUnit>, TicketingError>
where
    T: InventoryTx + ?Sized,
{
    if quantity == 0 {
        return Err(TicketingError::InvalidRequest(format!(
            "quantity for category '{category}' must be at least 1"
        )));
    }

    let mut units = tx.lock_available_units(event_id, category, quantity).await?;
    if units.len() < quantity as usize {
        tracing::debug!(
            event_id = %event_id,
            category,
            requested = quantity,
            found = units.len(),
            "Short claim, re-reading availability"
        );
        units = tx.lock_available_units(event_id, category, quantity).await?;
    }

    if units.len() < quantity as usize {
        return Err(TicketingError::InsufficientStock {
            category: category.to_string(),
            requested: quantity,
            available: u32::try_from(units.len()).unwrap_or(u32::MAX),
        });
    }

    tracing::debug!(
        event_id = %event_id,
        category,
        quantity,
        first_unit = %units[0].id,
        "Units claimed"
    );
    Ok(units)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boxoffice_core::store::TicketStore;
    use boxoffice_testing::{InMemoryTicketStore, fixtures};

    #[tokio::test]
    async fn claims_oldest_units_first() {
        let store = InMemoryTicketStore::new();
        let event = fixtures::seed_event(&store, &[("GA", 5000, 3)]).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let units = claim(&mut *tx, event.id, "GA", 2).await.unwrap();

        let ids: Vec<i64> = units.iter().map(|u| u.id.get()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn short_stock_names_category_and_shortfall() {
        let store = InMemoryTicketStore::new();
        let event = fixtures::seed_event(&store, &[("VIP", 15_000, 1)]).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = claim(&mut *tx, event.id, "VIP", 2).await.unwrap_err();

        assert_eq!(
            err,
            TicketingError::InsufficientStock {
                category: "VIP".into(),
                requested: 2,
                available: 1,
            }
        );
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let store = InMemoryTicketStore::new();
        let event = fixtures::seed_event(&store, &[("GA", 5000, 1)]).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = claim(&mut *tx, event.id, "GA", 0).await.unwrap_err();
        assert!(matches!(err, TicketingError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn unknown_category_has_no_stock() {
        let store = InMemoryTicketStore::new();
        let event = fixtures::seed_event(&store, &[("GA", 5000, 1)]).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = claim(&mut *tx, event.id, "Balcony", 1).await.unwrap_err();
        assert!(matches!(err, TicketingError::InsufficientStock { available: 0, .. }));
    }
}
