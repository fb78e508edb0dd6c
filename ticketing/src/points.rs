//! Loyalty points: pricing policy and the ledger.
//!
//! Redemption converts points into a discount and earning converts the
//! amount actually paid into points. Both rates are configuration.
//!
//! ```text
//! discount      = redeem_points × 100 / redeem_points_per_unit   (cents)
//! total         = max(0, subtotal − discount)
//! points_earned = ⌊total_cents × earn_points_per_unit / 100⌋
//! ```
//!
//! Every balance change goes through [`PointsLedger`], which journals an
//! immutable entry and applies the amount to the cached balance in the same
//! store operation.

use boxoffice_core::error::TicketingError;
use boxoffice_core::money::Money;
use boxoffice_core::store::PointsTx;
use boxoffice_core::types::{NewPointEntry, OrderId, PointEntry, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason recorded for the registration bonus.
pub const REASON_SIGNUP_BONUS: &str = "Welcome Bonus!";
/// Reason recorded when points pay for part of an order.
pub const REASON_REDEEMED: &str = "Used points for discount";
/// Reason recorded when a paid order earns points.
pub const REASON_EARNED: &str = "Earned from purchase";

/// Exchange rates between points and money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Points needed for one currency unit of discount (0 disables redemption)
    pub redeem_points_per_unit: u32,
    /// Points earned per currency unit paid
    pub earn_points_per_unit: u32,
    /// Points credited on registration
    pub signup_bonus: i64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            redeem_points_per_unit: 100,
            earn_points_per_unit: 10,
            signup_bonus: 100,
        }
    }
}

/// Priced checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Sum of claimed unit prices
    pub subtotal: Money,
    /// Value of the redeemed points
    pub discount: Money,
    /// Amount due
    pub total: Money,
    /// Points credited once paid
    pub points_earned: i64,
}

impl PricingPolicy {
    /// Price a subtotal with `redeem_points` applied.
    ///
    /// A discount larger than the subtotal is clamped; the surplus points
    /// are still spent.
    #[must_use]
    pub fn quote(&self, subtotal: Money, redeem_points: i64) -> Quote {
        let points = u64::try_from(redeem_points).unwrap_or(0);
        let discount_cents = if self.redeem_points_per_unit == 0 {
            0
        } else {
            points.saturating_mul(100) / u64::from(self.redeem_points_per_unit)
        };
        let discount = Money::from_cents(discount_cents);
        let total = subtotal.saturating_sub(discount);
        let earned = total.cents().saturating_mul(u64::from(self.earn_points_per_unit)) / 100;
        Quote {
            subtotal,
            discount,
            total,
            points_earned: i64::try_from(earned).unwrap_or(i64::MAX),
        }
    }
}

/// The append-only point ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointsLedger;

impl PointsLedger {
    /// Journal a signed amount. Zero amounts write nothing.
    ///
    /// # Errors
    ///
    /// [`TicketingError::UserNotFound`] if the account does not exist, or a
    /// store error.
    pub async fn post<T>(
        tx: &mut T,
        user_id: UserId,
        amount: i64,
        reason: &str,
        order_id: Option<OrderId>,
        at: DateTime<Utc>,
    ) -> Result<Option<PointEntry>, TicketingError>
    where
        T: PointsTx + ?Sized,
    {
        if amount == 0 {
            return Ok(None);
        }
        let entry = tx
            .append_point_entry(NewPointEntry {
                user_id,
                amount,
                reason: reason.to_string(),
                order_id,
                created_at: at,
            })
            .await?
            .ok_or(TicketingError::UserNotFound(user_id))?;

        tracing::debug!(
            user_id = %user_id,
            amount,
            balance = entry.balance_after,
            reason,
            "Point entry journaled"
        );
        Ok(Some(entry))
    }

    /// Credit `points`.
    ///
    /// # Errors
    ///
    /// [`TicketingError::InvalidRequest`] if `points` is negative, otherwise
    /// see [`PointsLedger::post`].
    pub async fn credit<T>(
        tx: &mut T,
        user_id: UserId,
        points: i64,
        reason: &str,
        order_id: Option<OrderId>,
        at: DateTime<Utc>,
    ) -> Result<Option<PointEntry>, TicketingError>
    where
        T: PointsTx + ?Sized,
    {
        Self::post(tx, user_id, non_negative(points)?, reason, order_id, at).await
    }

    /// Debit `points`.
    ///
    /// # Errors
    ///
    /// [`TicketingError::InvalidRequest`] if `points` is negative, otherwise
    /// see [`PointsLedger::post`].
    pub async fn debit<T>(
        tx: &mut T,
        user_id: UserId,
        points: i64,
        reason: &str,
        order_id: Option<OrderId>,
        at: DateTime<Utc>,
    ) -> Result<Option<PointEntry>, TicketingError>
    where
        T: PointsTx + ?Sized,
    {
        Self::post(tx, user_id, -non_negative(points)?, reason, order_id, at).await
    }
}

fn non_negative(points: i64) -> Result<i64, TicketingError> {
    if points < 0 {
        return Err(TicketingError::InvalidRequest(format!(
            "point amount must not be negative, got {points}"
        )));
    }
    Ok(points)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boxoffice_core::store::TicketStore;
    use boxoffice_testing::{InMemoryTicketStore, fixtures, test_epoch};

    #[test]
    fn hundred_points_take_one_unit_off() {
        let quote = PricingPolicy::default().quote(Money::from_cents(5000), 100);
        assert_eq!(quote.discount, Money::from_cents(100));
        assert_eq!(quote.total, Money::from_cents(4900));
        assert_eq!(quote.points_earned, 490);
    }

    #[test]
    fn discount_is_clamped_to_subtotal() {
        let quote = PricingPolicy::default().quote(Money::from_cents(500), 1_000);
        assert_eq!(quote.total, Money::ZERO);
        assert_eq!(quote.points_earned, 0);
    }

    #[test]
    fn earning_rounds_down() {
        // 0.15 paid at 10 points per unit is 1.5 points
        let quote = PricingPolicy::default().quote(Money::from_cents(15), 0);
        assert_eq!(quote.points_earned, 1);
    }

    #[test]
    fn rates_are_configurable() {
        let policy = PricingPolicy {
            redeem_points_per_unit: 50,
            earn_points_per_unit: 1,
            signup_bonus: 0,
        };
        let quote = policy.quote(Money::from_cents(10_000), 100);
        assert_eq!(quote.total, Money::from_cents(9_800));
        assert_eq!(quote.points_earned, 98);
    }

    #[test]
    fn zero_redeem_rate_disables_redemption() {
        let policy = PricingPolicy {
            redeem_points_per_unit: 0,
            ..PricingPolicy::default()
        };
        assert_eq!(policy.quote(Money::from_cents(100), 500).discount, Money::ZERO);
    }

    #[tokio::test]
    async fn negative_credit_and_debit_are_rejected() {
        let store = InMemoryTicketStore::new();
        let user = fixtures::seed_user(&store, "neg@example.com", 100).await.unwrap();
        let mut tx = store.begin().await.unwrap();

        let credit = PointsLedger::credit(&mut *tx, user.id, -5, "Oops", None, test_epoch()).await;
        assert!(matches!(credit, Err(TicketingError::InvalidRequest(_))));
        let debit = PointsLedger::debit(&mut *tx, user.id, -5, "Oops", None, test_epoch()).await;
        assert!(matches!(debit, Err(TicketingError::InvalidRequest(_))));

        let entry = PointsLedger::debit(&mut *tx, user.id, 40, "Redeemed", None, test_epoch())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.amount, -40);
        assert_eq!(entry.balance_after, 60);
    }
}
