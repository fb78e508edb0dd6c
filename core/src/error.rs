//! Error taxonomy.
//!
//! Two layers:
//!
//! - [`StoreError`]: what a store implementation reports. The only
//!   distinction the domain cares about is whether a failure is transient
//!   (lock timeout, serialization failure, lost connection) or not.
//! - [`TicketingError`]: what checkout, payment, sweeper and check-in
//!   operations report to their callers.

use crate::types::{EventId, OrderId, OrderStatus, UnitId, UserId};
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Errors raised by a ticket store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Retryable: lock wait timed out, serialization conflict, deadlock,
    /// statement timeout or the connection went away.
    #[error("Transient store failure: {0}")]
    Transient(String),

    /// A unique constraint rejected the write (for example a taken email).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Non-retryable database error (constraint violation, bad SQL, ...).
    #[error("Database error: {0}")]
    Database(String),

    /// A stored value could not be mapped back into a domain type.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Returns true if retrying the whole transaction may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Errors surfaced by the ticketing operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketingError {
    /// Not enough free units in a category.
    #[error("Insufficient stock for category '{category}': requested {requested}, available {available}")]
    InsufficientStock {
        /// Category that ran short
        category: String,
        /// Units requested
        requested: u32,
        /// Units that could be claimed
        available: u32,
    },

    /// Redemption exceeds the user's balance.
    #[error("Insufficient points: requested {requested}, balance {balance}")]
    InsufficientPoints {
        /// Points the caller asked to redeem
        requested: i64,
        /// Balance less points promised to pending orders
        balance: i64,
    },

    /// Finalize on an order that is not pending.
    #[error("Order {order_id} cannot be finalized from status '{status}'")]
    OrderNotFinalizable {
        /// Order
        order_id: OrderId,
        /// Status found
        status: OrderStatus,
    },

    /// Cancel on an order that is not pending.
    #[error("Order {order_id} cannot be cancelled from status '{status}'")]
    OrderNotCancellable {
        /// Order
        order_id: OrderId,
        /// Status found
        status: OrderStatus,
    },

    /// Order does not exist (or is not visible to the caller).
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Event does not exist.
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// User does not exist.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Ticket unit does not exist.
    #[error("Ticket not found: {0}")]
    UnitNotFound(UnitId),

    /// Scan of a unit that has not been paid for.
    #[error("Ticket {0} has not been paid for")]
    UnpaidTicket(UnitId),

    /// Scan at the wrong event.
    #[error("Ticket {unit_id} is for event {actual}, not {expected}")]
    WrongEvent {
        /// Unit scanned
        unit_id: UnitId,
        /// Event the scanner is admitting
        expected: EventId,
        /// Event the unit belongs to
        actual: EventId,
    },

    /// Second scan of an admitted unit.
    #[error(
        "ALREADY USED: ticket {unit_id} scanned {} ago at {}",
        format_elapsed(.elapsed),
        format_clock(.checked_in_at)
    )]
    AlreadyUsed {
        /// Unit scanned
        unit_id: UnitId,
        /// First admission time
        checked_in_at: DateTime<Utc>,
        /// Time since first admission
        elapsed: Duration,
    },

    /// Malformed input (zero quantity, negative redemption, empty cart, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The write collides with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Lock timeout or connection loss; the caller should retry.
    #[error("Transient store failure, retry: {0}")]
    TransientStoreFailure(String),

    /// Any other store failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl TicketingError {
    /// Returns true if the operation may succeed when retried unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStoreFailure(_))
    }
}

impl From<StoreError> for TicketingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Transient(msg) => Self::TransientStoreFailure(msg),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Store(other.to_string()),
        }
    }
}

fn format_clock(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Renders a duration for door staff: `"2h 5m"`, `"3m 12s"`, `"40s"`.
fn format_elapsed(elapsed: &Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn transient_store_errors_become_retryable() {
        let err: TicketingError = StoreError::Transient("lock timeout".into()).into();
        assert!(err.is_retryable());

        let err: TicketingError = StoreError::Database("constraint".into()).into();
        assert!(!err.is_retryable());
        assert!(matches!(err, TicketingError::Store(_)));

        let err: TicketingError = StoreError::Conflict("email taken".into()).into();
        assert_eq!(err, TicketingError::Conflict("email taken".into()));
    }

    #[test]
    fn already_used_message_reports_elapsed_time() {
        let checked_in_at = Utc.with_ymd_and_hms(2025, 1, 1, 19, 30, 0).unwrap();
        let err = TicketingError::AlreadyUsed {
            unit_id: UnitId::new(7),
            checked_in_at,
            elapsed: Duration::seconds(125),
        };
        let message = err.to_string();
        assert!(message.starts_with("ALREADY USED"));
        assert!(message.contains("2m 5s ago"));
        assert!(message.contains("19:30:00"));
    }

    #[test]
    fn elapsed_formatting_picks_largest_units() {
        assert_eq!(format_elapsed(&Duration::seconds(40)), "40s");
        assert_eq!(format_elapsed(&Duration::seconds(3 * 3600 + 120)), "3h 2m");
        assert_eq!(format_elapsed(&Duration::seconds(-5)), "0s");
    }

    #[test]
    fn insufficient_stock_names_the_category() {
        let err = TicketingError::InsufficientStock {
            category: "VIP".into(),
            requested: 3,
            available: 1,
        };
        assert!(err.to_string().contains("'VIP'"));
    }
}
