//! Store capability traits.
//!
//! The durable store is split into one capability set per aggregate:
//!
//! - [`InventoryTx`]: ticket unit selection, claiming, selling, releasing
//!   and check-in stamping
//! - [`OrderTx`]: order rows
//! - [`PointsTx`]: user accounts and the append-only point ledger
//!
//! All three are implemented by one transaction object
//! ([`StoreTransaction`]) so that a checkout, a finalize or an expiry is a
//! single atomic unit of work. Dropping a transaction without committing
//! rolls it back.
//!
//! Components that only need one capability take `&mut T` where
//! `T: InventoryTx + ?Sized` (for example), which accepts both a concrete
//! transaction and `&mut dyn StoreTransaction`.
//!
//! # Concurrency
//!
//! The store's transaction isolation is the only concurrency primitive.
//! [`InventoryTx::lock_available_units`] and [`OrderTx::lock_order`] must
//! take exclusive row locks held until commit or rollback, so that racing
//! checkouts serialize on the same units and racing finalize/expire calls
//! serialize on the same order.
//!
//! # Dyn Compatibility
//!
//! Methods return [`StoreFuture`] (a pinned boxed future) instead of using
//! `async fn`, so the store can be shared as `Arc<dyn TicketStore>`.

use crate::error::StoreError;
use crate::types::{
    CategoryStock, Event, EventId, NewEvent, NewOrder, NewPointEntry, NewUser, Order, OrderId,
    OrderStatus, PointEntry, TicketUnit, UnitId, User, UserId,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every store method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Ticket unit operations inside a transaction.
pub trait InventoryTx: Send {
    /// Select up to `limit` available units of `category` for `event_id`,
    /// oldest id first, taking an exclusive row lock on each.
    ///
    /// A unit locked by another open transaction is waited on (bounded by
    /// the store's lock timeout, reported as [`StoreError::Transient`]) and
    /// then re-evaluated; a unit claimed by that transaction is skipped.
    /// May return fewer than `limit` units.
    fn lock_available_units<'a>(
        &'a mut self,
        event_id: EventId,
        category: &'a str,
        limit: u32,
    ) -> StoreFuture<'a, Vec<TicketUnit>>;

    /// Point the given units at `order_id`. Returns the number of rows updated.
    fn assign_units<'a>(
        &'a mut self,
        unit_ids: &'a [UnitId],
        order_id: OrderId,
    ) -> StoreFuture<'a, u64>;

    /// Mark every unit owned by `order_id` as sold.
    fn mark_units_sold(&mut self, order_id: OrderId) -> StoreFuture<'_, u64>;

    /// Detach every unsold unit from `order_id`, returning it to the pool.
    fn release_units(&mut self, order_id: OrderId) -> StoreFuture<'_, u64>;

    /// Fetch one unit with an exclusive row lock.
    fn lock_unit(&mut self, unit_id: UnitId) -> StoreFuture<'_, Option<TicketUnit>>;

    /// Stamp the first admission time on a unit.
    fn stamp_check_in(&mut self, unit_id: UnitId, at: DateTime<Utc>) -> StoreFuture<'_, ()>;
}

/// Order operations inside a transaction.
pub trait OrderTx: Send {
    /// Insert a new order row.
    fn insert_order(&mut self, order: NewOrder) -> StoreFuture<'_, Order>;

    /// Fetch an order with an exclusive row lock.
    fn lock_order(&mut self, order_id: OrderId) -> StoreFuture<'_, Option<Order>>;

    /// Overwrite the status (and `updated_at`) of an order.
    fn set_order_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()>;

    /// Record the payment collaborator's reference for an order.
    fn set_payment_reference<'a>(
        &'a mut self,
        order_id: OrderId,
        reference: &'a str,
    ) -> StoreFuture<'a, ()>;
}

/// User and point ledger operations inside a transaction.
pub trait PointsTx: Send {
    /// Insert a user with a zero balance.
    fn insert_user(&mut self, user: NewUser) -> StoreFuture<'_, User>;

    /// Fetch a user (no lock).
    fn fetch_user(&mut self, user_id: UserId) -> StoreFuture<'_, Option<User>>;

    /// Fetch a user and lock the row until the transaction ends.
    fn lock_user(&mut self, user_id: UserId) -> StoreFuture<'_, Option<User>>;

    /// Points promised to the user's pending orders and not yet debited.
    fn pending_redemptions(&mut self, user_id: UserId) -> StoreFuture<'_, i64>;

    /// Append a ledger entry and apply its amount to the user's balance as a
    /// single atomic increment. Returns `None` if the user does not exist.
    fn append_point_entry(&mut self, entry: NewPointEntry) -> StoreFuture<'_, Option<PointEntry>>;
}

/// One atomic unit of work spanning all capabilities.
pub trait StoreTransaction: InventoryTx + OrderTx + PointsTx {
    /// Commit every write made through this transaction.
    fn commit(self: Box<Self>) -> StoreFuture<'static, ()>;

    /// Discard every write made through this transaction.
    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()>;
}

/// Durable ticket store.
pub trait TicketStore: Send + Sync {
    /// Open a transaction.
    fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>>;

    /// Ids of pending orders created before `cutoff`, oldest first.
    fn stale_pending_orders(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> StoreFuture<'_, Vec<OrderId>>;

    /// Read one order.
    fn order(&self, order_id: OrderId) -> StoreFuture<'_, Option<Order>>;

    /// Units currently owned by an order, by id.
    fn order_units(&self, order_id: OrderId) -> StoreFuture<'_, Vec<TicketUnit>>;

    /// Read one user.
    fn user(&self, user_id: UserId) -> StoreFuture<'_, Option<User>>;

    /// Most recent ledger entries for a user, newest first.
    fn point_history(&self, user_id: UserId, limit: u32) -> StoreFuture<'_, Vec<PointEntry>>;

    /// Read one ticket unit.
    fn unit(&self, unit_id: UnitId) -> StoreFuture<'_, Option<TicketUnit>>;

    /// Read one event.
    fn event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>>;

    /// Catalog boundary: create an event and generate all of its units in
    /// one transaction. Returns the event and the number of units created.
    fn create_event_with_stock(
        &self,
        event: NewEvent,
        created_at: DateTime<Utc>,
    ) -> StoreFuture<'_, (Event, u64)>;

    /// Per-category stock counts for an event, ordered by category.
    fn inventory_summary(&self, event_id: EventId) -> StoreFuture<'_, Vec<CategoryStock>>;
}
