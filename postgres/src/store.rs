//! Pool management and the non-transactional read side.

use crate::error::classify;
use crate::rows::{self, ENTRY_COLUMNS, EVENT_COLUMNS, ORDER_COLUMNS, UNIT_COLUMNS, USER_COLUMNS};
use crate::transaction::PostgresTransaction;
use boxoffice_core::error::StoreError;
use boxoffice_core::store::{StoreFuture, StoreTransaction, TicketStore};
use boxoffice_core::types::{
    CategoryStock, Event, EventId, NewEvent, Order, OrderId, PointEntry, TicketUnit, UnitId, User,
    UserId,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use std::time::Duration;

/// Connection and timeout settings for [`PostgresTicketStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresSettings {
    /// Connection URL
    pub url: String,
    /// Maximum pool size
    pub max_connections: u32,
    /// Minimum idle connections kept open
    pub min_connections: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout: Duration,
    /// Idle connections older than this are closed
    pub idle_timeout: Duration,
    /// Server-side cap on any single statement
    pub statement_timeout: Duration,
    /// Server-side cap on waiting for a row lock, applied per transaction
    pub lock_timeout: Duration,
}

impl PostgresSettings {
    /// Settings for `url` with conservative defaults.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            statement_timeout: Duration::from_secs(60),
            lock_timeout: Duration::from_secs(5),
        }
    }
}

/// `PostgreSQL` implementation of [`TicketStore`].
#[derive(Debug, Clone)]
pub struct PostgresTicketStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresTicketStore {
    /// Connect a pool using `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the URL is invalid or the pool cannot connect.
    pub async fn connect(settings: &PostgresSettings) -> Result<Self, StoreError> {
        let options = PgConnectOptions::from_str(&settings.url)
            .map_err(classify)?
            .options([(
                "statement_timeout",
                format!("{}", settings.statement_timeout.as_millis()),
            )]);

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(Some(settings.idle_timeout))
            .connect_with(options)
            .await
            .map_err(classify)?;

        tracing::info!(
            max_connections = settings.max_connections,
            lock_timeout_ms = settings.lock_timeout.as_millis(),
            "Connected ticket store pool"
        );

        Ok(Self {
            pool,
            lock_timeout: settings.lock_timeout,
        })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {e}")))?;
        tracing::info!("Ticket store migrations complete");
        Ok(())
    }
}

impl TicketStore for PostgresTicketStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(classify)?;
            sqlx::query("SELECT set_config('lock_timeout', $1, true)")
                .bind(format!("{}ms", self.lock_timeout.as_millis()))
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
            Ok(Box::new(PostgresTransaction::new(tx)) as Box<dyn StoreTransaction>)
        })
    }

    fn stale_pending_orders(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> StoreFuture<'_, Vec<OrderId>> {
        Box::pin(async move {
            let found = sqlx::query(
                r"
                SELECT id
                FROM orders
                WHERE status = 'pending' AND created_at < $1
                ORDER BY created_at ASC
                LIMIT $2
                ",
            )
            .bind(cutoff)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
            found
                .iter()
                .map(|row| {
                    row.try_get("id")
                        .map(OrderId::from_uuid)
                        .map_err(|e| StoreError::Corrupt(e.to_string()))
                })
                .collect()
        })
    }

    fn order(&self, order_id: OrderId) -> StoreFuture<'_, Option<Order>> {
        Box::pin(async move {
            let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
            let row = sqlx::query(&sql)
                .bind(*order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(classify)?;
            row.as_ref().map(rows::order).transpose()
        })
    }

    fn order_units(&self, order_id: OrderId) -> StoreFuture<'_, Vec<TicketUnit>> {
        Box::pin(async move {
            let sql =
                format!("SELECT {UNIT_COLUMNS} FROM ticket_units WHERE order_id = $1 ORDER BY id");
            let found = sqlx::query(&sql)
                .bind(*order_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(classify)?;
            found.iter().map(rows::unit).collect()
        })
    }

    fn user(&self, user_id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
            let row = sqlx::query(&sql)
                .bind(*user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(classify)?;
            row.as_ref().map(rows::user).transpose()
        })
    }

    fn point_history(&self, user_id: UserId, limit: u32) -> StoreFuture<'_, Vec<PointEntry>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {ENTRY_COLUMNS} FROM point_entries \
                 WHERE user_id = $1 ORDER BY id DESC LIMIT $2"
            );
            let found = sqlx::query(&sql)
                .bind(*user_id.as_uuid())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
                .map_err(classify)?;
            found.iter().map(rows::entry).collect()
        })
    }

    fn unit(&self, unit_id: UnitId) -> StoreFuture<'_, Option<TicketUnit>> {
        Box::pin(async move {
            let sql = format!("SELECT {UNIT_COLUMNS} FROM ticket_units WHERE id = $1");
            let row = sqlx::query(&sql)
                .bind(unit_id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(classify)?;
            row.as_ref().map(rows::unit).transpose()
        })
    }

    fn event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
            let row = sqlx::query(&sql)
                .bind(*event_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(classify)?;
            row.as_ref().map(rows::event).transpose()
        })
    }

    fn create_event_with_stock(
        &self,
        event: NewEvent,
        created_at: DateTime<Utc>,
    ) -> StoreFuture<'_, (Event, u64)> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(classify)?;

            let sql = format!(
                r"
                INSERT INTO events (id, name, venue, date, description, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {EVENT_COLUMNS}
                "
            );
            let row = sqlx::query(&sql)
                .bind(*EventId::new().as_uuid())
                .bind(&event.name)
                .bind(&event.venue)
                .bind(event.date)
                .bind(&event.description)
                .bind(created_at)
                .fetch_one(&mut *tx)
                .await
                .map_err(classify)?;
            let created = rows::event(&row)?;

            let mut units = 0;
            for tier in &event.tiers {
                let price = tier.price.to_i64().ok_or_else(|| {
                    StoreError::Database(format!("price out of range: {}", tier.price))
                })?;
                let result = sqlx::query(
                    r"
                    INSERT INTO ticket_units (event_id, category, price_cents)
                    SELECT $1, $2, $3 FROM generate_series(1, $4)
                    ",
                )
                .bind(*created.id.as_uuid())
                .bind(&tier.category)
                .bind(price)
                .bind(i64::from(tier.quantity))
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
                units += result.rows_affected();
            }

            tx.commit().await.map_err(classify)?;
            Ok((created, units))
        })
    }

    fn inventory_summary(&self, event_id: EventId) -> StoreFuture<'_, Vec<CategoryStock>> {
        Box::pin(async move {
            let found = sqlx::query(
                r"
                SELECT
                    category,
                    MIN(price_cents) AS price_cents,
                    COUNT(*) FILTER (WHERE NOT sold AND order_id IS NULL) AS available,
                    COUNT(*) FILTER (WHERE NOT sold AND order_id IS NOT NULL) AS reserved,
                    COUNT(*) FILTER (WHERE sold) AS sold,
                    COUNT(*) FILTER (WHERE checked_in_at IS NOT NULL) AS checked_in
                FROM ticket_units
                WHERE event_id = $1
                GROUP BY category
                ORDER BY category
                ",
            )
            .bind(*event_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
            found.iter().map(rows::category_stock).collect()
        })
    }
}
