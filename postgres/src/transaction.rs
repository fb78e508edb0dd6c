//! One database transaction implementing every store capability.

use crate::error::classify;
use crate::rows::{self, ENTRY_COLUMNS, ORDER_COLUMNS, UNIT_COLUMNS, USER_COLUMNS};
use boxoffice_core::error::StoreError;
use boxoffice_core::store::{InventoryTx, OrderTx, PointsTx, StoreFuture, StoreTransaction};
use boxoffice_core::types::{
    EventId, NewOrder, NewPointEntry, NewUser, Order, OrderId, OrderStatus, PointEntry, PointKind,
    TicketUnit, UnitId, User, UserId,
};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};

/// A `PostgreSQL` transaction. Dropping it without commit rolls back.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PostgresTransaction {
    pub(crate) const fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

impl InventoryTx for PostgresTransaction {
    fn lock_available_units<'a>(
        &'a mut self,
        event_id: EventId,
        category: &'a str,
        limit: u32,
    ) -> StoreFuture<'a, Vec<TicketUnit>> {
        Box::pin(async move {
            let sql = format!(
                r"
                SELECT {UNIT_COLUMNS}
                FROM ticket_units
                WHERE event_id = $1
                  AND category = $2
                  AND sold = FALSE
                  AND order_id IS NULL
                ORDER BY id ASC
                LIMIT $3
                FOR UPDATE
                "
            );
            let found = sqlx::query(&sql)
                .bind(*event_id.as_uuid())
                .bind(category)
                .bind(i64::from(limit))
                .fetch_all(&mut *self.tx)
                .await
                .map_err(classify)?;
            found.iter().map(rows::unit).collect()
        })
    }

    fn assign_units<'a>(
        &'a mut self,
        unit_ids: &'a [UnitId],
        order_id: OrderId,
    ) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let ids: Vec<i64> = unit_ids.iter().map(UnitId::get).collect();
            let result = sqlx::query(
                r"
                UPDATE ticket_units
                SET order_id = $1
                WHERE id = ANY($2)
                ",
            )
            .bind(*order_id.as_uuid())
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
            Ok(result.rows_affected())
        })
    }

    fn mark_units_sold(&mut self, order_id: OrderId) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let result = sqlx::query("UPDATE ticket_units SET sold = TRUE WHERE order_id = $1")
                .bind(*order_id.as_uuid())
                .execute(&mut *self.tx)
                .await
                .map_err(classify)?;
            Ok(result.rows_affected())
        })
    }

    fn release_units(&mut self, order_id: OrderId) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE ticket_units
                SET order_id = NULL
                WHERE order_id = $1 AND sold = FALSE
                ",
            )
            .bind(*order_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
            Ok(result.rows_affected())
        })
    }

    fn lock_unit(&mut self, unit_id: UnitId) -> StoreFuture<'_, Option<TicketUnit>> {
        Box::pin(async move {
            let sql = format!("SELECT {UNIT_COLUMNS} FROM ticket_units WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&sql)
                .bind(unit_id.get())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(classify)?;
            row.as_ref().map(rows::unit).transpose()
        })
    }

    fn stamp_check_in(&mut self, unit_id: UnitId, at: DateTime<Utc>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("UPDATE ticket_units SET checked_in_at = $2 WHERE id = $1")
                .bind(unit_id.get())
                .bind(at)
                .execute(&mut *self.tx)
                .await
                .map_err(classify)?;
            Ok(())
        })
    }
}

impl OrderTx for PostgresTransaction {
    fn insert_order(&mut self, order: NewOrder) -> StoreFuture<'_, Order> {
        Box::pin(async move {
            let total = order
                .total
                .to_i64()
                .ok_or_else(|| {
                    StoreError::Database(format!("order total out of range: {}", order.total))
                })?;
            let sql = format!(
                r"
                INSERT INTO orders (
                    id, user_id, event_id, status, total_cents,
                    points_applied, points_earned, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
                RETURNING {ORDER_COLUMNS}
                "
            );
            let row = sqlx::query(&sql)
                .bind(*order.id.as_uuid())
                .bind(*order.user_id.as_uuid())
                .bind(*order.event_id.as_uuid())
                .bind(order.status.as_str())
                .bind(total)
                .bind(order.points_applied)
                .bind(order.points_earned)
                .bind(order.created_at)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(classify)?;
            rows::order(&row)
        })
    }

    fn lock_order(&mut self, order_id: OrderId) -> StoreFuture<'_, Option<Order>> {
        Box::pin(async move {
            let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&sql)
                .bind(*order_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(classify)?;
            row.as_ref().map(rows::order).transpose()
        })
    }

    fn set_order_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
                .bind(*order_id.as_uuid())
                .bind(status.as_str())
                .bind(at)
                .execute(&mut *self.tx)
                .await
                .map_err(classify)?;
            Ok(())
        })
    }

    fn set_payment_reference<'a>(
        &'a mut self,
        order_id: OrderId,
        reference: &'a str,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query("UPDATE orders SET payment_reference = $2 WHERE id = $1")
                .bind(*order_id.as_uuid())
                .bind(reference)
                .execute(&mut *self.tx)
                .await
                .map_err(classify)?;
            Ok(())
        })
    }
}

impl PointsTx for PostgresTransaction {
    fn insert_user(&mut self, user: NewUser) -> StoreFuture<'_, User> {
        Box::pin(async move {
            let sql = format!(
                r"
                INSERT INTO users (id, name, email, points_balance, created_at)
                VALUES ($1, $2, $3, 0, $4)
                RETURNING {USER_COLUMNS}
                "
            );
            let row = sqlx::query(&sql)
                .bind(*user.id.as_uuid())
                .bind(&user.name)
                .bind(&user.email)
                .bind(user.created_at)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(classify)?;
            rows::user(&row)
        })
    }

    fn fetch_user(&mut self, user_id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
            let row = sqlx::query(&sql)
                .bind(*user_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(classify)?;
            row.as_ref().map(rows::user).transpose()
        })
    }

    fn lock_user(&mut self, user_id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&sql)
                .bind(*user_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(classify)?;
            row.as_ref().map(rows::user).transpose()
        })
    }

    fn pending_redemptions(&mut self, user_id: UserId) -> StoreFuture<'_, i64> {
        Box::pin(async move {
            let total: i64 = sqlx::query_scalar(
                r"
                SELECT COALESCE(SUM(points_applied), 0)::BIGINT
                FROM orders
                WHERE user_id = $1 AND status = $2
                ",
            )
            .bind(*user_id.as_uuid())
            .bind(OrderStatus::Pending.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(classify)?;
            Ok(total)
        })
    }

    fn append_point_entry(&mut self, entry: NewPointEntry) -> StoreFuture<'_, Option<PointEntry>> {
        Box::pin(async move {
            // One statement: the balance increment and the ledger insert
            // commit or fail together, and the increment is atomic.
            let sql = format!(
                r"
                WITH updated AS (
                    UPDATE users
                    SET points_balance = points_balance + $2
                    WHERE id = $1
                    RETURNING points_balance
                )
                INSERT INTO point_entries (
                    user_id, amount, kind, reason, order_id, balance_after, created_at
                )
                SELECT $1, $2, $3, $4, $5, updated.points_balance, $6
                FROM updated
                RETURNING {ENTRY_COLUMNS}
                "
            );
            let row = sqlx::query(&sql)
                .bind(*entry.user_id.as_uuid())
                .bind(entry.amount)
                .bind(PointKind::of(entry.amount).as_str())
                .bind(&entry.reason)
                .bind(entry.order_id.map(|id| *id.as_uuid()))
                .bind(entry.created_at)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(classify)?;
            row.as_ref().map(rows::entry).transpose()
        })
    }
}

impl StoreTransaction for PostgresTransaction {
    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        let Self { tx } = *self;
        Box::pin(async move { tx.commit().await.map_err(classify) })
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        let Self { tx } = *self;
        Box::pin(async move { tx.rollback().await.map_err(classify) })
    }
}
