//! Seed data helpers.
//!
//! These write through the public store traits, so they work against the
//! in-memory store and the `PostgreSQL` store alike.

use crate::mocks::test_epoch;
use boxoffice_core::error::StoreError;
use boxoffice_core::money::Money;
use boxoffice_core::store::{PointsTx, StoreTransaction, TicketStore};
use boxoffice_core::types::{Event, NewEvent, NewPointEntry, NewUser, TierSpec, User, UserId};

/// Create an event with the given `(category, price_cents, quantity)` tiers.
///
/// # Errors
///
/// Returns whatever the store reports.
pub async fn seed_event<S>(store: &S, tiers: &[(&str, u64, u32)]) -> Result<Event, StoreError>
where
    S: TicketStore + ?Sized,
{
    let tiers = tiers
        .iter()
        .map(|(category, cents, quantity)| TierSpec {
            category: (*category).to_string(),
            price: Money::from_cents(*cents),
            quantity: *quantity,
        })
        .collect();
    let (event, _) = store
        .create_event_with_stock(
            NewEvent {
                name: "Neptune Live".to_string(),
                venue: "Harbour Arena".to_string(),
                date: test_epoch(),
                description: "Seeded for tests".to_string(),
                tiers,
            },
            test_epoch(),
        )
        .await?;
    Ok(event)
}

/// Create a user whose balance is `points`, journaled as one seed entry so
/// the balance still equals the ledger sum.
///
/// # Errors
///
/// Returns whatever the store reports.
pub async fn seed_user<S>(store: &S, email: &str, points: i64) -> Result<User, StoreError>
where
    S: TicketStore + ?Sized,
{
    let mut tx = store.begin().await?;
    let user = tx
        .insert_user(NewUser {
            id: UserId::new(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            created_at: test_epoch(),
        })
        .await?;
    let mut balance = user.points_balance;
    if points != 0 {
        if let Some(entry) = tx
            .append_point_entry(NewPointEntry {
                user_id: user.id,
                amount: points,
                reason: "Seed balance".to_string(),
                order_id: None,
                created_at: test_epoch(),
            })
            .await?
        {
            balance = entry.balance_after;
        }
    }
    tx.commit().await?;
    Ok(User {
        points_balance: balance,
        ..user
    })
}
