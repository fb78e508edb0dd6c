//! Door check-in through the desk.
//!
//! Run with: `cargo test --test checkin_test`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use boxoffice_core::environment::Clock;
use boxoffice_core::error::TicketingError;
use boxoffice_core::types::{CheckoutItem, EventId, UnitId};
use chrono::Duration;
use common::Harness;
use std::sync::Arc;
use ticketing::CheckoutRequest;

#[tokio::test]
async fn sold_ticket_is_admitted_once() {
    let h = Harness::new();
    let event = h.event(&[("GA", 5000, 2)]).await;
    let user = h.user("ray@example.com", 0).await;
    let booking = h
        .components
        .checkout
        .book_immediate(user.id, event.id, CheckoutItem::new("GA", 1))
        .await
        .unwrap();
    let unit_id = booking.tickets[0].id;
    let operator = h.user("door@example.com", 0).await;

    let admitted = h.components.desk.scan(Some(operator.id), unit_id, event.id).await.unwrap();
    assert_eq!(admitted.checked_in_at, Some(h.clock.now()));

    h.clock.advance(Duration::minutes(3));
    let err = h.components.desk.scan(None, unit_id, event.id).await.unwrap_err();
    assert!(
        matches!(err, TicketingError::AlreadyUsed { unit_id: id, elapsed, .. }
            if id == unit_id && elapsed == Duration::minutes(3)),
        "{err:?}"
    );
    assert!(err_message(&h, unit_id, event.id).await.starts_with("ALREADY USED"));

    let record = h
        .audit
        .records()
        .into_iter()
        .find(|r| r.action == "ticket.checked_in")
        .unwrap();
    assert_eq!(record.actor, Some(*operator.id.as_uuid()));
}

async fn err_message(h: &Harness, unit_id: UnitId, event_id: EventId) -> String {
    h.components
        .desk
        .scan(None, unit_id, event_id)
        .await
        .unwrap_err()
        .to_string()
}

#[tokio::test]
async fn reserved_but_unpaid_ticket_is_refused() {
    let h = Harness::new();
    let event = h.event(&[("GA", 5000, 1)]).await;
    let user = h.user("sam@example.com", 0).await;
    let receipt = h
        .components
        .checkout
        .initiate_checkout(
            user.id,
            CheckoutRequest {
                event_id: event.id,
                items: vec![CheckoutItem::new("GA", 1)],
                redeem_points: 0,
            },
        )
        .await
        .unwrap();
    let unit_id = receipt.units[0].id;

    let err = h.components.desk.scan(None, unit_id, event.id).await.unwrap_err();
    assert_eq!(err, TicketingError::UnpaidTicket(unit_id));
    assert_eq!(h.store.units(event.id).await[0].checked_in_at, None);

    // Once paid the same ticket goes through.
    h.components.checkout.complete_payment(receipt.order_id).await.unwrap();
    h.components.desk.scan(None, unit_id, event.id).await.unwrap();
}

#[tokio::test]
async fn ticket_for_another_event_is_refused_without_stamping() {
    let h = Harness::new();
    let tonight = h.event(&[("GA", 5000, 1)]).await;
    let tomorrow = h.event(&[("GA", 5000, 1)]).await;
    let user = h.user("tia@example.com", 0).await;
    let booking = h
        .components
        .checkout
        .book_immediate(user.id, tonight.id, CheckoutItem::new("GA", 1))
        .await
        .unwrap();
    let unit_id = booking.tickets[0].id;

    let err = h.components.desk.scan(None, unit_id, tomorrow.id).await.unwrap_err();
    assert_eq!(
        err,
        TicketingError::WrongEvent {
            unit_id,
            expected: tomorrow.id,
            actual: tonight.id
        }
    );
    assert_eq!(h.store.units(tonight.id).await[0].checked_in_at, None);
}

#[tokio::test]
async fn used_ticket_reports_already_used_even_at_the_wrong_door() {
    let h = Harness::new();
    let tonight = h.event(&[("GA", 5000, 1)]).await;
    let other = h.event(&[("GA", 5000, 1)]).await;
    let user = h.user("uma@example.com", 0).await;
    let booking = h
        .components
        .checkout
        .book_immediate(user.id, tonight.id, CheckoutItem::new("GA", 1))
        .await
        .unwrap();
    let unit_id = booking.tickets[0].id;
    h.components.desk.scan(None, unit_id, tonight.id).await.unwrap();

    let err = h.components.desk.scan(None, unit_id, other.id).await.unwrap_err();
    assert!(matches!(err, TicketingError::AlreadyUsed { .. }));
}

#[tokio::test]
async fn unknown_ticket_is_not_found() {
    let h = Harness::new();
    let event = h.event(&[("GA", 5000, 1)]).await;
    let missing = UnitId::new(999_999);

    let err = h.components.desk.scan(None, missing, event.id).await.unwrap_err();
    assert_eq!(err, TicketingError::UnitNotFound(missing));
}

#[tokio::test]
async fn bulk_scan_reports_each_ticket_independently() {
    let h = Harness::new();
    let event = h.event(&[("GA", 5000, 3)]).await;
    let user = h.user("vic@example.com", 0).await;
    let booking = h
        .components
        .checkout
        .book_immediate(user.id, event.id, CheckoutItem::new("GA", 2))
        .await
        .unwrap();
    let (first, second) = (booking.tickets[0].id, booking.tickets[1].id);
    let unsold = h
        .store
        .units(event.id)
        .await
        .into_iter()
        .find(|u| u.is_available())
        .unwrap()
        .id;
    h.components.desk.scan(None, second, event.id).await.unwrap();

    let outcomes = h
        .components
        .desk
        .scan_many(None, &[first, second, unsold], event.id)
        .await;
    let admitted: Vec<_> = outcomes.iter().map(|o| o.admitted).collect();
    assert_eq!(admitted, vec![true, false, false]);
    assert!(matches!(outcomes[1].result(), Err(TicketingError::AlreadyUsed { .. })));
    assert_eq!(outcomes[2].result(), &Err(TicketingError::UnpaidTicket(unsold)));
    assert!(outcomes[0].error.is_none());
    assert!(outcomes[2].error.is_some());
    assert!(h.audit.actions().contains(&"ticket.bulk_checked_in".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_scans_admit_once() {
    let h = Harness::new();
    let event = h.event(&[("GA", 5000, 1)]).await;
    let user = h.user("wes@example.com", 0).await;
    let booking = h
        .components
        .checkout
        .book_immediate(user.id, event.id, CheckoutItem::new("GA", 1))
        .await
        .unwrap();
    let (unit_id, event_id) = (booking.tickets[0].id, event.id);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let desk = Arc::clone(&h.components.desk);
            tokio::spawn(async move { desk.scan(None, unit_id, event_id).await })
        })
        .collect();
    let results = futures::future::join_all(handles).await;
    let admitted = results.into_iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    assert_eq!(admitted, 1);
}
