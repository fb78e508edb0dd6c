//! Door check-in.
//!
//! Per unit: `Unsold → Sold → CheckedIn`. A scan never reverses and a
//! rejected scan writes nothing. Rules, in order:
//!
//! | Unit state                      | Result          |
//! |---------------------------------|-----------------|
//! | not sold                        | `UnpaidTicket`  |
//! | already checked in (any event)  | `AlreadyUsed`   |
//! | sold for a different event      | `WrongEvent`    |
//! | sold, not checked in            | admitted        |

use crate::metrics;
use crate::transaction;
use boxoffice_core::audit::{AuditLog, AuditRecord};
use boxoffice_core::environment::Clock;
use boxoffice_core::error::TicketingError;
use boxoffice_core::store::{InventoryTx, TicketStore};
use boxoffice_core::types::{CheckInState, EventId, TicketUnit, UnitId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Decide whether `unit` may be admitted to `expected_event` at `now`.
///
/// # Errors
///
/// The rejection, per the table above.
pub fn evaluate(
    unit: &TicketUnit,
    expected_event: EventId,
    now: DateTime<Utc>,
) -> Result<(), TicketingError> {
    match (unit.check_in_state(), unit.checked_in_at) {
        (CheckInState::Unsold, _) => Err(TicketingError::UnpaidTicket(unit.id)),
        (CheckInState::CheckedIn, Some(checked_in_at)) => Err(TicketingError::AlreadyUsed {
            unit_id: unit.id,
            checked_in_at,
            elapsed: now - checked_in_at,
        }),
        _ if unit.event_id != expected_event => Err(TicketingError::WrongEvent {
            unit_id: unit.id,
            expected: expected_event,
            actual: unit.event_id,
        }),
        _ => Ok(()),
    }
}

/// Result of one scan in a bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    /// Unit scanned
    pub unit_id: UnitId,
    /// True if admitted
    pub admitted: bool,
    /// Rejection message, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    result: Result<TicketUnit, TicketingError>,
}

impl ScanOutcome {
    fn new(unit_id: UnitId, result: Result<TicketUnit, TicketingError>) -> Self {
        Self {
            unit_id,
            admitted: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
            result,
        }
    }

    /// The typed result.
    #[must_use]
    pub const fn result(&self) -> &Result<TicketUnit, TicketingError> {
        &self.result
    }
}

/// The check-in desk.
pub struct CheckInDesk {
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditLog>,
}

impl CheckInDesk {
    /// Create a desk.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self { store, clock, audit }
    }

    /// Scan one unit for `expected_event`.
    ///
    /// The unit row is locked for the check so two simultaneous scans of the
    /// same ticket admit it once.
    ///
    /// # Errors
    ///
    /// [`TicketingError::UnitNotFound`], or a rejection from [`evaluate`].
    pub async fn scan(
        &self,
        operator: Option<UserId>,
        unit_id: UnitId,
        expected_event: EventId,
    ) -> Result<TicketUnit, TicketingError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let result = admit(&mut *tx, unit_id, expected_event, now).await;
        let outcome = transaction::finish(tx, result).await;

        match &outcome {
            Ok(_) => {
                metrics::record_check_in("admitted");
                tracing::info!(unit_id = %unit_id, event_id = %expected_event, "Ticket admitted");
                self.audit.record(AuditRecord::new(
                    operator.map(|u| *u.as_uuid()),
                    "ticket.checked_in",
                    unit_id,
                    format!("admitted to event {expected_event}"),
                ));
            },
            Err(err) => {
                metrics::record_check_in(metrics::error_label(err));
                tracing::info!(
                    unit_id = %unit_id,
                    event_id = %expected_event,
                    error = %err,
                    "Ticket rejected"
                );
            },
        }
        outcome
    }

    /// Scan several units, each in its own transaction.
    ///
    /// One rejection has no effect on the other units.
    pub async fn scan_many(
        &self,
        operator: Option<UserId>,
        unit_ids: &[UnitId],
        expected_event: EventId,
    ) -> Vec<ScanOutcome> {
        let mut outcomes = Vec::with_capacity(unit_ids.len());
        for &unit_id in unit_ids {
            let result = self.scan(operator, unit_id, expected_event).await;
            outcomes.push(ScanOutcome::new(unit_id, result));
        }
        let admitted = outcomes.iter().filter(|o| o.admitted).count();
        self.audit.record(AuditRecord::new(
            operator.map(|u| *u.as_uuid()),
            "ticket.bulk_checked_in",
            expected_event,
            format!("{admitted} of {} admitted", unit_ids.len()),
        ));
        outcomes
    }
}

async fn admit<T>(
    tx: &mut T,
    unit_id: UnitId,
    expected_event: EventId,
    now: DateTime<Utc>,
) -> Result<TicketUnit, TicketingError>
where
    T: InventoryTx + ?Sized,
{
    let mut unit = tx
        .lock_unit(unit_id)
        .await?
        .ok_or(TicketingError::UnitNotFound(unit_id))?;
    evaluate(&unit, expected_event, now)?;
    tx.stamp_check_in(unit_id, now).await?;
    unit.checked_in_at = Some(now);
    Ok(unit)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boxoffice_core::money::Money;
    use boxoffice_core::types::OrderId;
    use chrono::Duration;

    fn unit(event_id: EventId, sold: bool, checked_in_at: Option<DateTime<Utc>>) -> TicketUnit {
        TicketUnit {
            id: UnitId::new(1),
            event_id,
            category: "GA".into(),
            price: Money::from_cents(5000),
            sold,
            order_id: sold.then(OrderId::new),
            checked_in_at,
        }
    }

    #[test]
    fn unsold_units_are_unpaid() {
        let event = EventId::new();
        let err = evaluate(&unit(event, false, None), event, Utc::now()).unwrap_err();
        assert_eq!(err, TicketingError::UnpaidTicket(UnitId::new(1)));
    }

    #[test]
    fn sold_unit_for_the_right_event_is_admitted() {
        let event = EventId::new();
        assert!(evaluate(&unit(event, true, None), event, Utc::now()).is_ok());
    }

    #[test]
    fn sold_unit_for_another_event_is_refused() {
        let (mine, theirs) = (EventId::new(), EventId::new());
        let err = evaluate(&unit(mine, true, None), theirs, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            TicketingError::WrongEvent { expected, actual, .. }
                if expected == theirs && actual == mine
        ));
    }

    #[test]
    fn second_scan_is_already_used_even_at_another_event() {
        let event = EventId::new();
        let first = Utc::now();
        let now = first + Duration::minutes(5);
        let scanned = unit(event, true, Some(first));

        for expected in [event, EventId::new()] {
            let err = evaluate(&scanned, expected, now).unwrap_err();
            assert!(matches!(
                err,
                TicketingError::AlreadyUsed { elapsed, .. } if elapsed == Duration::minutes(5)
            ));
        }
    }
}
