//! The seed helpers, exercised through the public store traits.

#![allow(clippy::unwrap_used)]

use boxoffice_core::StoreError;
use boxoffice_core::store::TicketStore;
use boxoffice_testing::{InMemoryTicketStore, fixtures};

#[tokio::test]
async fn seeded_event_has_one_unit_per_ticket() {
    let store = InMemoryTicketStore::new();
    let event = fixtures::seed_event(&store, &[("GA", 5000, 3), ("VIP", 20000, 1)])
        .await
        .unwrap();

    let stock = store.inventory_summary(event.id).await.unwrap();
    let counts: Vec<_> = stock.iter().map(|c| (c.category.as_str(), c.available)).collect();
    assert_eq!(counts, vec![("GA", 3), ("VIP", 1)]);
    assert_eq!(store.units(event.id).await.len(), 4);
}

#[tokio::test]
async fn seeded_balance_is_journaled() {
    let store = InMemoryTicketStore::new();
    let user = fixtures::seed_user(&store, "lin@example.com", 250).await.unwrap();

    assert_eq!(user.points_balance, 250);
    assert_eq!(store.ledger_sum(user.id).await, 250);
    let entries = store.entries(user.id).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].balance_after, 250);
}

#[tokio::test]
async fn zero_balance_writes_no_entry() {
    let store = InMemoryTicketStore::new();
    let user = fixtures::seed_user(&store, "mo@example.com", 0).await.unwrap();
    assert!(store.entries(user.id).await.is_empty());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let store = InMemoryTicketStore::new();
    fixtures::seed_user(&store, "ned@example.com", 0).await.unwrap();

    let err = fixtures::seed_user(&store, "ned@example.com", 0).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
    // The failed transaction left the store usable.
    fixtures::seed_user(&store, "ola@example.com", 0).await.unwrap();
}
