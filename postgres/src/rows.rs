//! Row decoding.

use boxoffice_core::error::StoreError;
use boxoffice_core::money::Money;
use boxoffice_core::types::{
    CategoryStock, Event, EventId, Order, OrderId, OrderStatus, PointEntry, PointKind, TicketUnit,
    UnitId, User, UserId,
};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row};
use uuid::Uuid;

pub(crate) const UNIT_COLUMNS: &str =
    "id, event_id, category, price_cents, sold, order_id, checked_in_at";
pub(crate) const ORDER_COLUMNS: &str = "id, user_id, event_id, status, total_cents, \
     points_applied, points_earned, payment_reference, created_at, updated_at";
pub(crate) const USER_COLUMNS: &str = "id, name, email, points_balance, created_at";
pub(crate) const ENTRY_COLUMNS: &str =
    "id, user_id, amount, kind, reason, order_id, balance_after, created_at";
pub(crate) const EVENT_COLUMNS: &str = "id, name, venue, date, description, created_at";

fn col<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Corrupt(format!("column {name}: {e}")))
}

fn money(row: &PgRow, name: &str) -> Result<Money, StoreError> {
    let cents: i64 = col(row, name)?;
    Money::from_i64(cents).ok_or_else(|| StoreError::Corrupt(format!("negative {name}: {cents}")))
}

fn count(row: &PgRow, name: &str) -> Result<u64, StoreError> {
    let n: i64 = col(row, name)?;
    u64::try_from(n).map_err(|_| StoreError::Corrupt(format!("negative {name}: {n}")))
}

pub(crate) fn unit(row: &PgRow) -> Result<TicketUnit, StoreError> {
    Ok(TicketUnit {
        id: UnitId::new(col(row, "id")?),
        event_id: EventId::from_uuid(col(row, "event_id")?),
        category: col(row, "category")?,
        price: money(row, "price_cents")?,
        sold: col(row, "sold")?,
        order_id: col::<Option<Uuid>>(row, "order_id")?.map(OrderId::from_uuid),
        checked_in_at: col(row, "checked_in_at")?,
    })
}

pub(crate) fn order(row: &PgRow) -> Result<Order, StoreError> {
    let status: String = col(row, "status")?;
    Ok(Order {
        id: OrderId::from_uuid(col(row, "id")?),
        user_id: UserId::from_uuid(col(row, "user_id")?),
        event_id: EventId::from_uuid(col(row, "event_id")?),
        status: OrderStatus::parse(&status)?,
        total: money(row, "total_cents")?,
        points_applied: col(row, "points_applied")?,
        points_earned: col(row, "points_earned")?,
        payment_reference: col(row, "payment_reference")?,
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

pub(crate) fn user(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: UserId::from_uuid(col(row, "id")?),
        name: col(row, "name")?,
        email: col(row, "email")?,
        points_balance: col(row, "points_balance")?,
        created_at: col(row, "created_at")?,
    })
}

pub(crate) fn entry(row: &PgRow) -> Result<PointEntry, StoreError> {
    let amount: i64 = col(row, "amount")?;
    let kind: String = col(row, "kind")?;
    let kind = match kind.as_str() {
        "earned" => PointKind::Earned,
        "redeemed" => PointKind::Redeemed,
        other => return Err(StoreError::Corrupt(format!("Invalid point kind: {other}"))),
    };
    Ok(PointEntry {
        id: col(row, "id")?,
        user_id: UserId::from_uuid(col(row, "user_id")?),
        amount,
        kind,
        reason: col(row, "reason")?,
        order_id: col::<Option<Uuid>>(row, "order_id")?.map(OrderId::from_uuid),
        balance_after: col(row, "balance_after")?,
        created_at: col(row, "created_at")?,
    })
}

pub(crate) fn event(row: &PgRow) -> Result<Event, StoreError> {
    Ok(Event {
        id: EventId::from_uuid(col(row, "id")?),
        name: col(row, "name")?,
        venue: col(row, "venue")?,
        date: col(row, "date")?,
        description: col(row, "description")?,
        created_at: col(row, "created_at")?,
    })
}

pub(crate) fn category_stock(row: &PgRow) -> Result<CategoryStock, StoreError> {
    Ok(CategoryStock {
        category: col(row, "category")?,
        price: money(row, "price_cents")?,
        available: count(row, "available")?,
        reserved: count(row, "reserved")?,
        sold: count(row, "sold")?,
        checked_in: count(row, "checked_in")?,
    })
}
