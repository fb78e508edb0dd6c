//! Order ledger: the order lifecycle.
//!
//! ```text
//!            ┌──finalize──▶ paid
//! pending ───┼──expire────▶ expired
//!            └──cancel────▶ cancelled
//! ```
//!
//! Every transition locks the order row first and re-checks the status under
//! that lock. This status guard is what makes finalize idempotent under
//! webhook redelivery and makes racing sweepers harmless: whichever
//! transaction gets the lock second sees a terminal status and stops.
//!
//! All methods run inside a caller-provided transaction; the caller commits
//! on success and rolls back on any error.

use crate::allocator;
use crate::payment_gateway::{PaymentGateway, PaymentReference};
use crate::points::{PointsLedger, PricingPolicy, Quote, REASON_EARNED, REASON_REDEEMED};
use boxoffice_core::error::TicketingError;
use boxoffice_core::money::Money;
use boxoffice_core::store::{InventoryTx, OrderTx, PointsTx};
use boxoffice_core::types::{
    CheckoutItem, EventId, NewOrder, Order, OrderId, OrderStatus, TicketUnit, UnitId, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Input to [`OrderLedger::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOrder {
    /// Authenticated buyer
    pub user_id: UserId,
    /// Event to buy for
    pub event_id: EventId,
    /// Requested lines
    pub items: Vec<CheckoutItem>,
    /// Points to redeem against the total
    pub redeem_points: i64,
}

/// A freshly opened pending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedOrder {
    /// The order row
    pub order: Order,
    /// Units now held by the order
    pub units: Vec<TicketUnit>,
    /// Pricing breakdown
    pub quote: Quote,
    /// Where to send the customer
    pub payment: PaymentReference,
}

/// Result of finalizing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedOrder {
    /// The order, now paid
    pub order: Order,
    /// Units marked sold
    pub units_sold: u64,
}

/// Result of an immediate booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookedOrder {
    /// The order, created paid
    pub order: Order,
    /// Units sold to it, as committed
    pub tickets: Vec<TicketUnit>,
}

/// Result of an expiry attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireOutcome {
    /// The order was pending and is now expired.
    Expired {
        /// Units returned to the pool
        released: u64,
    },
    /// The order had already left `pending`; nothing was touched.
    Skipped {
        /// Status found under the lock
        status: OrderStatus,
    },
}

/// Order lifecycle operations.
pub struct OrderLedger {
    pricing: PricingPolicy,
    gateway: Arc<dyn PaymentGateway>,
}

impl OrderLedger {
    /// Create a ledger.
    #[must_use]
    pub fn new(pricing: PricingPolicy, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { pricing, gateway }
    }

    /// The pricing policy in force.
    #[must_use]
    pub const fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// Claim units for every line, price them and persist a pending order
    /// holding them.
    ///
    /// Lines naming the same category are merged, and categories are claimed
    /// in sorted order so concurrent multi-category checkouts take their row
    /// locks in the same order.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::InvalidRequest`] for an empty cart, a blank
    ///   category, a zero quantity or a negative redemption
    /// - [`TicketingError::UserNotFound`]
    /// - [`TicketingError::InsufficientPoints`] if the balance, less points
    ///   already promised to the user's pending orders, is below
    ///   `redeem_points`
    /// - [`TicketingError::InsufficientStock`] for the first short category
    /// - store errors
    pub async fn open<T>(
        &self,
        tx: &mut T,
        request: OpenOrder,
        at: DateTime<Utc>,
    ) -> Result<OpenedOrder, TicketingError>
    where
        T: InventoryTx + OrderTx + PointsTx + ?Sized,
    {
        let lines = merge_lines(&request.items)?;
        if request.redeem_points < 0 {
            return Err(TicketingError::InvalidRequest(
                "redeem_points must not be negative".to_string(),
            ));
        }

        // The user lock serializes opens for one account, so two pending
        // orders cannot promise the same points.
        let user = tx
            .lock_user(request.user_id)
            .await?
            .ok_or(TicketingError::UserNotFound(request.user_id))?;
        let promised = tx.pending_redemptions(request.user_id).await?;
        let available = user.points_balance - promised;
        if available < request.redeem_points {
            return Err(TicketingError::InsufficientPoints {
                requested: request.redeem_points,
                balance: available,
            });
        }

        let mut units = Vec::new();
        for (category, quantity) in &lines {
            units.extend(allocator::claim(tx, request.event_id, category, *quantity).await?);
        }

        let subtotal: Money = units.iter().map(|u| u.price).sum();
        let quote = self.pricing.quote(subtotal, request.redeem_points);

        let mut order = tx
            .insert_order(NewOrder {
                id: OrderId::new(),
                user_id: request.user_id,
                event_id: request.event_id,
                status: OrderStatus::Pending,
                total: quote.total,
                points_applied: request.redeem_points,
                points_earned: quote.points_earned,
                created_at: at,
            })
            .await?;

        link_units(tx, &units, order.id).await?;

        let payment = self.gateway.issue_reference(order.id, quote.total);
        tx.set_payment_reference(order.id, &payment.reference).await?;
        order.payment_reference = Some(payment.reference.clone());

        tracing::info!(
            order_id = %order.id,
            user_id = %order.user_id,
            units = units.len(),
            total = %quote.total,
            points_applied = order.points_applied,
            "Order opened"
        );

        Ok(OpenedOrder {
            order,
            units,
            quote,
            payment,
        })
    }

    /// Move a pending order to paid, sell its units and journal its points.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::OrderNotFound`]
    /// - [`TicketingError::OrderNotFinalizable`] if the order is not pending,
    ///   including when it was already finalized
    /// - store errors
    pub async fn finalize<T>(
        &self,
        tx: &mut T,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<FinalizedOrder, TicketingError>
    where
        T: InventoryTx + OrderTx + PointsTx + ?Sized,
    {
        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or(TicketingError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::Pending {
            return Err(TicketingError::OrderNotFinalizable {
                order_id,
                status: order.status,
            });
        }

        tx.set_order_status(order_id, OrderStatus::Paid, at).await?;
        let units_sold = tx.mark_units_sold(order_id).await?;

        PointsLedger::debit(
            tx,
            order.user_id,
            order.points_applied,
            REASON_REDEEMED,
            Some(order_id),
            at,
        )
        .await?;
        PointsLedger::credit(
            tx,
            order.user_id,
            order.points_earned,
            REASON_EARNED,
            Some(order_id),
            at,
        )
        .await?;

        order.status = OrderStatus::Paid;
        order.updated_at = at;

        tracing::info!(
            order_id = %order_id,
            units_sold,
            points_redeemed = order.points_applied,
            points_earned = order.points_earned,
            "Order finalized"
        );
        Ok(FinalizedOrder { order, units_sold })
    }

    /// Expire a pending order, returning its units to the pool.
    ///
    /// A non-pending order is left untouched and reported as skipped.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::OrderNotFound`]
    /// - store errors
    pub async fn expire<T>(
        &self,
        tx: &mut T,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<ExpireOutcome, TicketingError>
    where
        T: InventoryTx + OrderTx + ?Sized,
    {
        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(TicketingError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::Pending {
            tracing::debug!(order_id = %order_id, status = %order.status, "Expiry skipped");
            return Ok(ExpireOutcome::Skipped {
                status: order.status,
            });
        }

        let released = tx.release_units(order_id).await?;
        tx.set_order_status(order_id, OrderStatus::Expired, at).await?;

        tracing::info!(order_id = %order_id, released, "Order expired");
        Ok(ExpireOutcome::Expired { released })
    }

    /// Withdraw a pending order on behalf of its owner.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::OrderNotFound`] if the order does not exist or
    ///   belongs to someone else
    /// - [`TicketingError::OrderNotCancellable`] if it is not pending
    /// - store errors
    pub async fn cancel<T>(
        &self,
        tx: &mut T,
        user_id: UserId,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<u64, TicketingError>
    where
        T: InventoryTx + OrderTx + ?Sized,
    {
        let order = tx
            .lock_order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(TicketingError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::Pending {
            return Err(TicketingError::OrderNotCancellable {
                order_id,
                status: order.status,
            });
        }

        let released = tx.release_units(order_id).await?;
        tx.set_order_status(order_id, OrderStatus::Cancelled, at).await?;

        tracing::info!(order_id = %order_id, user_id = %user_id, released, "Order cancelled");
        Ok(released)
    }

    /// Claim, sell and credit in one step, with no pending phase.
    ///
    /// # Errors
    ///
    /// Same as [`OrderLedger::open`], minus the points checks.
    pub async fn book_paid<T>(
        &self,
        tx: &mut T,
        user_id: UserId,
        event_id: EventId,
        item: &CheckoutItem,
        at: DateTime<Utc>,
    ) -> Result<BookedOrder, TicketingError>
    where
        T: InventoryTx + OrderTx + PointsTx + ?Sized,
    {
        let lines = merge_lines(std::slice::from_ref(item))?;
        tx.fetch_user(user_id)
            .await?
            .ok_or(TicketingError::UserNotFound(user_id))?;

        let mut units = Vec::new();
        for (category, quantity) in &lines {
            units.extend(allocator::claim(tx, event_id, category, *quantity).await?);
        }
        let subtotal: Money = units.iter().map(|u| u.price).sum();
        let quote = self.pricing.quote(subtotal, 0);

        let order = tx
            .insert_order(NewOrder {
                id: OrderId::new(),
                user_id,
                event_id,
                status: OrderStatus::Paid,
                total: quote.total,
                points_applied: 0,
                points_earned: quote.points_earned,
                created_at: at,
            })
            .await?;
        link_units(tx, &units, order.id).await?;
        let units_sold = tx.mark_units_sold(order.id).await?;
        PointsLedger::credit(
            tx,
            user_id,
            quote.points_earned,
            REASON_EARNED,
            Some(order.id),
            at,
        )
        .await?;

        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            units_sold,
            total = %quote.total,
            "Immediate booking completed"
        );

        let tickets = units
            .into_iter()
            .map(|unit| TicketUnit {
                sold: true,
                order_id: Some(order.id),
                ..unit
            })
            .collect();
        Ok(BookedOrder { order, tickets })
    }
}

/// Validate lines and merge duplicate categories, sorted by category.
fn merge_lines(items: &[CheckoutItem]) -> Result<BTreeMap<String, u32>, TicketingError> {
    if items.is_empty() {
        return Err(TicketingError::InvalidRequest(
            "at least one item is required".to_string(),
        ));
    }
    let mut lines = BTreeMap::new();
    for item in items {
        let category = item.category.trim();
        if category.is_empty() {
            return Err(TicketingError::InvalidRequest(
                "category must not be blank".to_string(),
            ));
        }
        if item.quantity == 0 {
            return Err(TicketingError::InvalidRequest(format!(
                "quantity for category '{category}' must be at least 1"
            )));
        }
        let total: &mut u32 = lines.entry(category.to_string()).or_default();
        *total = total.checked_add(item.quantity).ok_or_else(|| {
            TicketingError::InvalidRequest(format!(
                "quantity for category '{category}' is too large"
            ))
        })?;
    }
    Ok(lines)
}

async fn link_units<T>(
    tx: &mut T,
    units: &[TicketUnit],
    order_id: OrderId,
) -> Result<(), TicketingError>
where
    T: InventoryTx + ?Sized,
{
    let ids: Vec<UnitId> = units.iter().map(|u| u.id).collect();
    let linked = tx.assign_units(&ids, order_id).await?;
    if linked != ids.len() as u64 {
        return Err(TicketingError::Store(format!(
            "linked {linked} of {} units to order {order_id}",
            ids.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_categories_are_merged_and_sorted() {
        let lines = merge_lines(&[
            CheckoutItem::new("VIP", 1),
            CheckoutItem::new("GA", 2),
            CheckoutItem::new("VIP", 2),
        ])
        .unwrap();
        assert_eq!(
            lines.into_iter().collect::<Vec<_>>(),
            vec![("GA".to_string(), 2), ("VIP".to_string(), 3)]
        );
    }

    #[test]
    fn empty_cart_is_invalid() {
        assert!(matches!(merge_lines(&[]), Err(TicketingError::InvalidRequest(_))));
    }

    #[test]
    fn blank_category_is_invalid() {
        assert!(matches!(
            merge_lines(&[CheckoutItem::new("  ", 1)]),
            Err(TicketingError::InvalidRequest(_))
        ));
    }

    #[test]
    fn overflowing_quantity_is_invalid() {
        assert!(matches!(
            merge_lines(&[CheckoutItem::new("GA", u32::MAX), CheckoutItem::new("GA", 1)]),
            Err(TicketingError::InvalidRequest(_))
        ));
    }
}
