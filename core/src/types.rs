//! Domain types shared by every boxoffice crate.

use crate::error::StoreError;
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an event
    EventId
);
uuid_id!(
    /// Unique identifier for an order (one checkout attempt)
    OrderId
);
uuid_id!(
    /// Unique identifier for a user account
    UserId
);

/// Unique identifier for a ticket unit.
///
/// Unit ids are assigned from a monotonically increasing sequence, so
/// ascending id order is creation order. The allocator relies on this to
/// hand out the oldest stock first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(i64);

impl UnitId {
    /// Wraps a raw sequence value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Events and inventory
// ============================================================================

/// An event tickets are sold for. Owned by the catalog; read-only here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// Display name
    pub name: String,
    /// Venue
    pub venue: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Description
    pub description: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// One pricing tier of stock to generate for a new event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    /// Category label, e.g. `"VIP"` or `"GA"`
    pub category: String,
    /// Price of each unit in this tier
    pub price: Money,
    /// Number of units to generate
    pub quantity: u32,
}

/// Catalog input: an event plus its initial stock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Display name
    pub name: String,
    /// Venue
    pub venue: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Description
    pub description: String,
    /// Stock to generate, one entry per category
    pub tiers: Vec<TierSpec>,
}

/// Where a unit is in its admission lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInState {
    /// Available or only reserved; not admissible
    Unsold,
    /// Paid for, not yet scanned
    Sold,
    /// Scanned at the door
    CheckedIn,
}

/// The atomic sellable instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketUnit {
    /// Unit ID
    pub id: UnitId,
    /// Event this unit admits to
    pub event_id: EventId,
    /// Category / tier label
    pub category: String,
    /// Price
    pub price: Money,
    /// Sold flag
    pub sold: bool,
    /// Owning order while reserved or sold
    pub order_id: Option<OrderId>,
    /// First successful scan
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl TicketUnit {
    /// True if the unit can be claimed by a new order.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        !self.sold && self.order_id.is_none()
    }

    /// Admission state derived from the sold flag and check-in stamp.
    #[must_use]
    pub const fn check_in_state(&self) -> CheckInState {
        match (self.sold, self.checked_in_at) {
            (false, _) => CheckInState::Unsold,
            (true, None) => CheckInState::Sold,
            (true, Some(_)) => CheckInState::CheckedIn,
        }
    }
}

/// Per-category stock counts for one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStock {
    /// Category label
    pub category: String,
    /// Unit price (lowest price in the category)
    pub price: Money,
    /// Free to claim
    pub available: u64,
    /// Held by pending orders
    pub reserved: u64,
    /// Sold, including checked-in
    pub sold: u64,
    /// Sold and scanned
    pub checked_in: u64,
}

// ============================================================================
// Orders
// ============================================================================

/// Order lifecycle status.
///
/// Transitions are one-directional: `pending` moves to exactly one of the
/// three terminal states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Units are held; waiting for payment
    Pending,
    /// Payment confirmed; units sold
    Paid,
    /// Abandoned; units returned by the sweeper
    Expired,
    /// Withdrawn by the customer; units returned
    Cancelled,
}

impl OrderStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse status from database string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if the string doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(StoreError::Corrupt(format!("Invalid order status: {s}"))),
        }
    }

    /// True for every status other than `pending`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One checkout attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID
    pub id: OrderId,
    /// Owning user
    pub user_id: UserId,
    /// Event the units belong to
    pub event_id: EventId,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Amount due after discount
    pub total: Money,
    /// Points redeemed against this order
    pub points_applied: i64,
    /// Points credited once the order is paid
    pub points_earned: i64,
    /// Opaque reference handed to the payment collaborator
    pub payment_reference: Option<String>,
    /// When the order was opened
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for an order row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    /// Order ID
    pub id: OrderId,
    /// Owning user
    pub user_id: UserId,
    /// Event the units belong to
    pub event_id: EventId,
    /// Initial status (`pending`, or `paid` for immediate bookings)
    pub status: OrderStatus,
    /// Amount due after discount
    pub total: Money,
    /// Points redeemed
    pub points_applied: i64,
    /// Points to credit on payment
    pub points_earned: i64,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// One requested line of a checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutItem {
    /// Category to claim from
    pub category: String,
    /// Units wanted
    pub quantity: u32,
}

impl CheckoutItem {
    /// Convenience constructor.
    #[must_use]
    pub fn new(category: impl Into<String>, quantity: u32) -> Self {
        Self {
            category: category.into(),
            quantity,
        }
    }
}

// ============================================================================
// Users and points
// ============================================================================

/// A customer account. `points_balance` caches the ledger sum.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Email (unique)
    pub email: String,
    /// Current point balance
    pub points_balance: i64,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a user row. The balance always starts at zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    /// User ID
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Email
    pub email: String,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

/// Direction of a point ledger entry, derived from the sign of its amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    /// Credit
    Earned,
    /// Debit
    Redeemed,
}

impl PointKind {
    /// Classifies a signed amount.
    #[must_use]
    pub const fn of(amount: i64) -> Self {
        if amount < 0 { Self::Redeemed } else { Self::Earned }
    }

    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Earned => "earned",
            Self::Redeemed => "redeemed",
        }
    }
}

/// Immutable point ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointEntry {
    /// Sequence id
    pub id: i64,
    /// Account the entry belongs to
    pub user_id: UserId,
    /// Signed amount: positive earns, negative redeems
    pub amount: i64,
    /// Earned or redeemed
    pub kind: PointKind,
    /// Human readable reason
    pub reason: String,
    /// Order that caused the entry, if any
    pub order_id: Option<OrderId>,
    /// Account balance right after this entry was applied
    pub balance_after: i64,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

/// Append payload for the point ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPointEntry {
    /// Account
    pub user_id: UserId,
    /// Signed amount
    pub amount: i64,
    /// Reason
    pub reason: String,
    /// Causing order
    pub order_id: Option<OrderId>,
    /// Timestamp
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(sold: bool, order: Option<OrderId>, checked_in: bool) -> TicketUnit {
        TicketUnit {
            id: UnitId::new(1),
            event_id: EventId::new(),
            category: "GA".to_string(),
            price: Money::from_cents(5000),
            sold,
            order_id: order,
            checked_in_at: checked_in.then(Utc::now),
        }
    }

    #[test]
    fn order_status_round_trips_through_database_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Expired,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Ok(status));
        }
        assert!(OrderStatus::parse("refunded").is_err());
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn reserved_unit_is_neither_available_nor_sold() {
        let reserved = unit(false, Some(OrderId::new()), false);
        assert!(!reserved.is_available());
        assert_eq!(reserved.check_in_state(), CheckInState::Unsold);
    }

    #[test]
    fn check_in_state_follows_sold_flag_and_stamp() {
        assert_eq!(unit(false, None, false).check_in_state(), CheckInState::Unsold);
        let order = Some(OrderId::new());
        assert_eq!(unit(true, order, false).check_in_state(), CheckInState::Sold);
        assert_eq!(unit(true, order, true).check_in_state(), CheckInState::CheckedIn);
    }

    #[test]
    fn point_kind_follows_sign() {
        assert_eq!(PointKind::of(490), PointKind::Earned);
        assert_eq!(PointKind::of(-100), PointKind::Redeemed);
    }
}
