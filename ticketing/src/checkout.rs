//! Checkout orchestrator.
//!
//! Composes the allocator, the order ledger and the points ledger into one
//! transaction per public operation. Every operation here:
//!
//! 1. opens a store transaction
//! 2. runs the ledger step against it
//! 3. commits on success or rolls back on any error ([`transaction::finish`])
//! 4. records metrics and an audit entry once the outcome is durable
//!
//! Transient store failures are surfaced as
//! [`TicketingError::TransientStoreFailure`] and never retried here; the
//! caller (client, webhook redelivery) retries.

use crate::metrics;
use crate::orders::{BookedOrder, FinalizedOrder, OpenOrder, OrderLedger};
use crate::points::{PointsLedger, REASON_SIGNUP_BONUS};
use crate::transaction;
use boxoffice_core::audit::{AuditLog, AuditRecord};
use boxoffice_core::environment::Clock;
use boxoffice_core::error::TicketingError;
use boxoffice_core::money::Money;
use boxoffice_core::store::TicketStore;
use boxoffice_core::types::{
    CheckoutItem, EventId, NewUser, Order, OrderId, PointEntry, TicketUnit, User, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default page size for [`Checkout::point_history`].
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// A checkout request from an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutRequest {
    /// Event to buy for
    pub event_id: EventId,
    /// Requested lines
    pub items: Vec<CheckoutItem>,
    /// Points to redeem
    #[serde(default)]
    pub redeem_points: i64,
}

/// What the customer gets back from a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    /// Pending order
    pub order_id: OrderId,
    /// Opaque payment reference
    pub payment_reference: String,
    /// Where to pay
    pub payment_url: String,
    /// Sum of unit prices
    pub subtotal: Money,
    /// Amount due
    pub total: Money,
    /// Points that will be deducted once paid
    pub points_applied: i64,
    /// Points that will be credited once paid
    pub points_earned: i64,
    /// Units held for this order
    pub units: Vec<TicketUnit>,
}

/// An order with its tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    /// The order
    pub order: Order,
    /// Units linked to it
    pub tickets: Vec<TicketUnit>,
}

/// The checkout orchestrator.
pub struct Checkout {
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
    ledger: Arc<OrderLedger>,
    audit: Arc<dyn AuditLog>,
}

impl Checkout {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        clock: Arc<dyn Clock>,
        ledger: Arc<OrderLedger>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            store,
            clock,
            ledger,
            audit,
        }
    }

    /// Create an account and credit the signup bonus in one transaction.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::InvalidRequest`] for a blank name or an email
    ///   without `@`
    /// - [`TicketingError::Conflict`] if the email is taken
    pub async fn register_user(&self, name: &str, email: &str) -> Result<User, TicketingError> {
        let (name, email) = (name.trim(), email.trim().to_lowercase());
        if name.is_empty() {
            return Err(TicketingError::InvalidRequest("name must not be blank".into()));
        }
        if !email.contains('@') {
            return Err(TicketingError::InvalidRequest(format!(
                "'{email}' is not an email address"
            )));
        }

        let now = self.clock.now();
        let bonus = self.ledger.pricing().signup_bonus;
        let mut tx = self.store.begin().await?;
        let result = async {
            let mut user = tx
                .insert_user(NewUser {
                    id: UserId::new(),
                    name: name.to_string(),
                    email,
                    created_at: now,
                })
                .await?;
            let bonus_entry =
                PointsLedger::credit(&mut *tx, user.id, bonus, REASON_SIGNUP_BONUS, None, now)
                    .await?;
            if let Some(entry) = bonus_entry {
                user.points_balance = entry.balance_after;
            }
            Ok::<_, TicketingError>(user)
        }
        .await;
        let user = transaction::finish(tx, result).await?;

        metrics::record_points("earned", bonus);
        tracing::info!(user_id = %user.id, bonus, "User registered");
        self.audit.record(AuditRecord::new(
            Some(*user.id.as_uuid()),
            "user.registered",
            user.id,
            format!("signup bonus {bonus} points"),
        ));
        Ok(user)
    }

    /// Reserve units and open a pending order awaiting payment.
    ///
    /// # Errors
    ///
    /// See [`OrderLedger::open`]. Nothing is reserved on error.
    pub async fn initiate_checkout(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, TicketingError> {
        let now = self.clock.now();
        let open = OpenOrder {
            user_id,
            event_id: request.event_id,
            items: request.items,
            redeem_points: request.redeem_points,
        };

        let mut tx = self.store.begin().await?;
        let result = self.ledger.open(&mut *tx, open, now).await;
        let opened = match transaction::finish(tx, result).await {
            Ok(opened) => opened,
            Err(err) => {
                metrics::record_checkout_failed(&err);
                tracing::info!(user_id = %user_id, error = %err, "Checkout rejected");
                return Err(err);
            },
        };

        metrics::record_order_opened(opened.units.len());
        self.audit.record(AuditRecord::new(
            Some(*user_id.as_uuid()),
            "checkout.initiated",
            opened.order.id,
            format!(
                "{} tickets, total {}, {} points applied",
                opened.units.len(),
                opened.quote.total,
                opened.order.points_applied
            ),
        ));

        Ok(CheckoutReceipt {
            order_id: opened.order.id,
            payment_reference: opened.payment.reference,
            payment_url: opened.payment.url,
            subtotal: opened.quote.subtotal,
            total: opened.quote.total,
            points_applied: opened.order.points_applied,
            points_earned: opened.order.points_earned,
            units: opened.units,
        })
    }

    /// Payment confirmation callback: finalize a pending order.
    ///
    /// Safe under at-least-once delivery: a second call for the same order
    /// fails with [`TicketingError::OrderNotFinalizable`] and changes nothing.
    ///
    /// # Errors
    ///
    /// See [`OrderLedger::finalize`].
    pub async fn complete_payment(
        &self,
        order_id: OrderId,
    ) -> Result<FinalizedOrder, TicketingError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let result = self.ledger.finalize(&mut *tx, order_id, now).await;
        let finalized = match transaction::finish(tx, result).await {
            Ok(finalized) => finalized,
            Err(err @ TicketingError::OrderNotFinalizable { .. }) => {
                tracing::debug!(order_id = %order_id, "Duplicate payment confirmation ignored");
                return Err(err);
            },
            Err(err) => return Err(err),
        };

        let order = &finalized.order;
        metrics::record_order_paid("paid", finalized.units_sold, order.total.cents());
        metrics::record_points("redeemed", order.points_applied);
        metrics::record_points("earned", order.points_earned);
        self.audit.record(AuditRecord::new(
            Some(*order.user_id.as_uuid()),
            "payment.completed",
            order.id,
            format!(
                "{} tickets sold, {} charged, {} points earned",
                finalized.units_sold, order.total, order.points_earned
            ),
        ));
        Ok(finalized)
    }

    /// Claim, sell and credit in one transaction with no payment step.
    ///
    /// # Errors
    ///
    /// See [`OrderLedger::book_paid`].
    pub async fn book_immediate(
        &self,
        user_id: UserId,
        event_id: EventId,
        item: CheckoutItem,
    ) -> Result<OrderDetails, TicketingError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let result = self.ledger.book_paid(&mut *tx, user_id, event_id, &item, now).await;
        let booked = match transaction::finish(tx, result).await {
            Ok(booked) => booked,
            Err(err) => {
                metrics::record_checkout_failed(&err);
                return Err(err);
            },
        };

        let BookedOrder { order, tickets } = booked;
        metrics::record_order_paid("booked", tickets.len() as u64, order.total.cents());
        metrics::record_points("earned", order.points_earned);
        self.audit.record(AuditRecord::new(
            Some(*user_id.as_uuid()),
            "booking.immediate",
            order.id,
            format!("{} x {} for {}", item.quantity, item.category, order.total),
        ));

        Ok(OrderDetails { order, tickets })
    }

    /// Withdraw a pending order owned by `user_id`.
    ///
    /// # Errors
    ///
    /// See [`OrderLedger::cancel`].
    pub async fn cancel_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<u64, TicketingError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let result = self.ledger.cancel(&mut *tx, user_id, order_id, now).await;
        let released = transaction::finish(tx, result).await?;

        metrics::record_order_released("cancelled", released);
        self.audit.record(AuditRecord::new(
            Some(*user_id.as_uuid()),
            "order.cancelled",
            order_id,
            format!("{released} tickets released"),
        ));
        Ok(released)
    }

    /// An order and its tickets, visible to its owner only.
    ///
    /// # Errors
    ///
    /// [`TicketingError::OrderNotFound`] if absent or owned by someone else.
    pub async fn order_details(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetails, TicketingError> {
        let order = self
            .store
            .order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(TicketingError::OrderNotFound(order_id))?;
        let tickets = self.store.order_units(order_id).await?;
        Ok(OrderDetails { order, tickets })
    }

    /// The user's account and their most recent ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// [`TicketingError::UserNotFound`].
    pub async fn point_history(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> Result<(User, Vec<PointEntry>), TicketingError> {
        let user = self
            .store
            .user(user_id)
            .await?
            .ok_or(TicketingError::UserNotFound(user_id))?;
        let entries = self
            .store
            .point_history(user_id, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
            .await?;
        Ok((user, entries))
    }
}
