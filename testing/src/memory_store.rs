//! In-memory ticket store.
//!
//! Every transaction holds the store mutex from `begin` until it is
//! committed, rolled back or dropped, and works on a private copy of the
//! state that is written back only on commit. Transactions are therefore
//! fully serialized, which gives the same outcomes as row locking for the
//! properties the core relies on (no oversell, single finalize, atomic
//! rollback) while staying deterministic.
//!
//! Faults can be injected per order to exercise error isolation.

use boxoffice_core::error::StoreError;
use boxoffice_core::store::{
    InventoryTx, OrderTx, PointsTx, StoreFuture, StoreTransaction, TicketStore,
};
use boxoffice_core::types::{
    CategoryStock, Event, EventId, NewEvent, NewOrder, NewPointEntry, NewUser, Order, OrderId,
    OrderStatus, PointEntry, PointKind, TicketUnit, UnitId, User, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::ready;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    events: HashMap<EventId, Event>,
    units: BTreeMap<UnitId, TicketUnit>,
    orders: HashMap<OrderId, Order>,
    users: HashMap<UserId, User>,
    entries: Vec<PointEntry>,
    next_unit_id: i64,
    next_entry_id: i64,
    failing_orders: HashSet<OrderId>,
}

/// Transactional in-memory implementation of [`TicketStore`].
///
/// Cloning is cheap and clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `lock_order` on `order_id` fail with a transient error.
    pub async fn fail_order_locks(&self, order_id: OrderId) {
        self.state.lock().await.failing_orders.insert(order_id);
    }

    /// Remove all injected faults.
    pub async fn clear_faults(&self) {
        self.state.lock().await.failing_orders.clear();
    }

    /// All units of an event, by id.
    pub async fn units(&self, event_id: EventId) -> Vec<TicketUnit> {
        self.state
            .lock()
            .await
            .units
            .values()
            .filter(|u| u.event_id == event_id)
            .cloned()
            .collect()
    }

    /// Sum of every ledger entry for a user.
    pub async fn ledger_sum(&self, user_id: UserId) -> i64 {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.amount)
            .sum()
    }

    /// Ledger entries for a user, oldest first.
    pub async fn entries(&self, user_id: UserId) -> Vec<PointEntry> {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Every order in the store.
    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.values().cloned().collect()
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn done<'a, T: Send + 'a>(result: Result<T, StoreError>) -> StoreFuture<'a, T> {
    Box::pin(ready(result))
}

impl InventoryTx for MemoryTransaction {
    fn lock_available_units<'a>(
        &'a mut self,
        event_id: EventId,
        category: &'a str,
        limit: u32,
    ) -> StoreFuture<'a, Vec<TicketUnit>> {
        let units = self
            .working
            .units
            .values()
            .filter(|u| u.event_id == event_id && u.category == category && u.is_available())
            .take(limit as usize)
            .cloned()
            .collect();
        done(Ok(units))
    }

    fn assign_units<'a>(
        &'a mut self,
        unit_ids: &'a [UnitId],
        order_id: OrderId,
    ) -> StoreFuture<'a, u64> {
        let mut updated = 0;
        for id in unit_ids {
            if let Some(unit) = self.working.units.get_mut(id) {
                unit.order_id = Some(order_id);
                updated += 1;
            }
        }
        done(Ok(updated))
    }

    fn mark_units_sold(&mut self, order_id: OrderId) -> StoreFuture<'_, u64> {
        let mut updated = 0;
        for unit in self.working.units.values_mut() {
            if unit.order_id == Some(order_id) {
                unit.sold = true;
                updated += 1;
            }
        }
        done(Ok(updated))
    }

    fn release_units(&mut self, order_id: OrderId) -> StoreFuture<'_, u64> {
        let mut released = 0;
        for unit in self.working.units.values_mut() {
            if unit.order_id == Some(order_id) && !unit.sold {
                unit.order_id = None;
                released += 1;
            }
        }
        done(Ok(released))
    }

    fn lock_unit(&mut self, unit_id: UnitId) -> StoreFuture<'_, Option<TicketUnit>> {
        done(Ok(self.working.units.get(&unit_id).cloned()))
    }

    fn stamp_check_in(&mut self, unit_id: UnitId, at: DateTime<Utc>) -> StoreFuture<'_, ()> {
        let result = match self.working.units.get_mut(&unit_id) {
            Some(unit) if unit.sold => {
                unit.checked_in_at = Some(at);
                Ok(())
            },
            Some(_) => Err(StoreError::Database(format!(
                "check constraint violated: unit {unit_id} checked in while unsold"
            ))),
            None => Err(StoreError::Database(format!("unit {unit_id} does not exist"))),
        };
        done(result)
    }
}

impl OrderTx for MemoryTransaction {
    fn insert_order(&mut self, order: NewOrder) -> StoreFuture<'_, Order> {
        let result = if self.working.orders.contains_key(&order.id) {
            Err(StoreError::Database(format!("duplicate order id {}", order.id)))
        } else if !self.working.users.contains_key(&order.user_id) {
            Err(StoreError::Database(format!(
                "foreign key violated: user {} does not exist",
                order.user_id
            )))
        } else {
            let row = Order {
                id: order.id,
                user_id: order.user_id,
                event_id: order.event_id,
                status: order.status,
                total: order.total,
                points_applied: order.points_applied,
                points_earned: order.points_earned,
                payment_reference: None,
                created_at: order.created_at,
                updated_at: order.created_at,
            };
            self.working.orders.insert(row.id, row.clone());
            Ok(row)
        };
        done(result)
    }

    fn lock_order(&mut self, order_id: OrderId) -> StoreFuture<'_, Option<Order>> {
        let result = if self.working.failing_orders.contains(&order_id) {
            Err(StoreError::Transient(format!(
                "lock timeout on order {order_id} (injected)"
            )))
        } else {
            Ok(self.working.orders.get(&order_id).cloned())
        };
        done(result)
    }

    fn set_order_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        let result = match self.working.orders.get_mut(&order_id) {
            Some(order) => {
                order.status = status;
                order.updated_at = at;
                Ok(())
            },
            None => Err(StoreError::Database(format!("order {order_id} does not exist"))),
        };
        done(result)
    }

    fn set_payment_reference<'a>(
        &'a mut self,
        order_id: OrderId,
        reference: &'a str,
    ) -> StoreFuture<'a, ()> {
        let result = match self.working.orders.get_mut(&order_id) {
            Some(order) => {
                order.payment_reference = Some(reference.to_string());
                Ok(())
            },
            None => Err(StoreError::Database(format!("order {order_id} does not exist"))),
        };
        done(result)
    }
}

impl PointsTx for MemoryTransaction {
    fn insert_user(&mut self, user: NewUser) -> StoreFuture<'_, User> {
        let duplicate = self.working.users.values().any(|u| u.email == user.email);
        let result = if duplicate {
            Err(StoreError::Conflict(format!(
                "duplicate key value violates unique constraint: email {}",
                user.email
            )))
        } else {
            let row = User {
                id: user.id,
                name: user.name,
                email: user.email,
                points_balance: 0,
                created_at: user.created_at,
            };
            self.working.users.insert(row.id, row.clone());
            Ok(row)
        };
        done(result)
    }

    fn fetch_user(&mut self, user_id: UserId) -> StoreFuture<'_, Option<User>> {
        done(Ok(self.working.users.get(&user_id).cloned()))
    }

    fn lock_user(&mut self, user_id: UserId) -> StoreFuture<'_, Option<User>> {
        done(Ok(self.working.users.get(&user_id).cloned()))
    }

    fn pending_redemptions(&mut self, user_id: UserId) -> StoreFuture<'_, i64> {
        let total = self
            .working
            .orders
            .values()
            .filter(|o| o.user_id == user_id && o.status == OrderStatus::Pending)
            .map(|o| o.points_applied)
            .sum();
        done(Ok(total))
    }

    fn append_point_entry(&mut self, entry: NewPointEntry) -> StoreFuture<'_, Option<PointEntry>> {
        let Some(user) = self.working.users.get_mut(&entry.user_id) else {
            return done(Ok(None));
        };
        user.points_balance += entry.amount;
        self.working.next_entry_id += 1;
        let row = PointEntry {
            id: self.working.next_entry_id,
            user_id: entry.user_id,
            amount: entry.amount,
            kind: PointKind::of(entry.amount),
            reason: entry.reason,
            order_id: entry.order_id,
            balance_after: user.points_balance,
            created_at: entry.created_at,
        };
        self.working.entries.push(row.clone());
        done(Ok(Some(row)))
    }
}

impl StoreTransaction for MemoryTransaction {
    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        let Self { mut guard, working } = *self;
        *guard = working;
        done(Ok(()))
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        drop(self);
        done(Ok(()))
    }
}

impl TicketStore for InMemoryTicketStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let guard = state.lock_owned().await;
            let working = guard.clone();
            Ok(Box::new(MemoryTransaction { guard, working }) as Box<dyn StoreTransaction>)
        })
    }

    fn stale_pending_orders(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> StoreFuture<'_, Vec<OrderId>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            let mut stale: Vec<&Order> = state
                .orders
                .values()
                .filter(|o| o.status == OrderStatus::Pending && o.created_at < cutoff)
                .collect();
            stale.sort_by_key(|o| o.created_at);
            Ok(stale.into_iter().take(limit as usize).map(|o| o.id).collect())
        })
    }

    fn order(&self, order_id: OrderId) -> StoreFuture<'_, Option<Order>> {
        Box::pin(async move { Ok(self.state.lock().await.orders.get(&order_id).cloned()) })
    }

    fn order_units(&self, order_id: OrderId) -> StoreFuture<'_, Vec<TicketUnit>> {
        Box::pin(async move {
            Ok(self
                .state
                .lock()
                .await
                .units
                .values()
                .filter(|u| u.order_id == Some(order_id))
                .cloned()
                .collect())
        })
    }

    fn user(&self, user_id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move { Ok(self.state.lock().await.users.get(&user_id).cloned()) })
    }

    fn point_history(&self, user_id: UserId, limit: u32) -> StoreFuture<'_, Vec<PointEntry>> {
        Box::pin(async move {
            Ok(self
                .state
                .lock()
                .await
                .entries
                .iter()
                .rev()
                .filter(|e| e.user_id == user_id)
                .take(limit as usize)
                .cloned()
                .collect())
        })
    }

    fn unit(&self, unit_id: UnitId) -> StoreFuture<'_, Option<TicketUnit>> {
        Box::pin(async move { Ok(self.state.lock().await.units.get(&unit_id).cloned()) })
    }

    fn event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move { Ok(self.state.lock().await.events.get(&event_id).cloned()) })
    }

    fn create_event_with_stock(
        &self,
        event: NewEvent,
        created_at: DateTime<Utc>,
    ) -> StoreFuture<'_, (Event, u64)> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let row = Event {
                id: EventId::new(),
                name: event.name,
                venue: event.venue,
                date: event.date,
                description: event.description,
                created_at,
            };
            let mut created = 0;
            for tier in &event.tiers {
                for _ in 0..tier.quantity {
                    state.next_unit_id += 1;
                    let id = UnitId::new(state.next_unit_id);
                    state.units.insert(
                        id,
                        TicketUnit {
                            id,
                            event_id: row.id,
                            category: tier.category.clone(),
                            price: tier.price,
                            sold: false,
                            order_id: None,
                            checked_in_at: None,
                        },
                    );
                    created += 1;
                }
            }
            state.events.insert(row.id, row.clone());
            Ok((row, created))
        })
    }

    fn inventory_summary(&self, event_id: EventId) -> StoreFuture<'_, Vec<CategoryStock>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            let mut by_category: BTreeMap<&str, CategoryStock> = BTreeMap::new();
            for unit in state.units.values().filter(|u| u.event_id == event_id) {
                let stock = by_category
                    .entry(unit.category.as_str())
                    .or_insert_with(|| CategoryStock {
                        category: unit.category.clone(),
                        price: unit.price,
                        available: 0,
                        reserved: 0,
                        sold: 0,
                        checked_in: 0,
                    });
                stock.price = stock.price.min(unit.price);
                if unit.sold {
                    stock.sold += 1;
                } else if unit.order_id.is_some() {
                    stock.reserved += 1;
                } else {
                    stock.available += 1;
                }
                if unit.checked_in_at.is_some() {
                    stock.checked_in += 1;
                }
            }
            Ok(by_category.into_values().collect())
        })
    }
}
