//! Expiry sweeper: abandoned pending orders release their units.
//!
//! Run with: `cargo test --test expiry_sweeper_test`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use boxoffice_core::types::{CheckoutItem, EventId, OrderStatus, UserId};
use chrono::Duration;
use common::Harness;
use std::sync::Arc;
use ticketing::{CheckoutReceipt, CheckoutRequest};
use tokio::sync::broadcast;

async fn open(h: &Harness, user_id: UserId, event_id: EventId, quantity: u32) -> CheckoutReceipt {
    h.components
        .checkout
        .initiate_checkout(
            user_id,
            CheckoutRequest {
                event_id,
                items: vec![CheckoutItem::new("GA", quantity)],
                redeem_points: 0,
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn stale_order_is_expired_and_its_units_become_claimable() {
    let h = Harness::new();
    let event = h.event(&[("GA", 5000, 2)]).await;
    let first = h.user("amy@example.com", 0).await;
    let second = h.user("bob@example.com", 0).await;
    let receipt = open(&h, first.id, event.id, 2).await;

    // Not yet past the timeout.
    h.clock.advance(Duration::minutes(10));
    let report = h.components.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.stale, 0);

    h.clock.advance(Duration::minutes(6));
    let report = h.components.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.stale, 1);
    assert_eq!(report.expired, 1);
    assert_eq!(report.units_released, 2);

    let details = h
        .components
        .checkout
        .order_details(first.id, receipt.order_id)
        .await
        .unwrap();
    assert_eq!(details.order.status, OrderStatus::Expired);
    assert!(h.store.units(event.id).await.iter().all(|u| u.is_available()));
    assert!(h.audit.actions().contains(&"orders.expired".to_string()));

    h.clock.advance(Duration::minutes(1));
    let again = open(&h, second.id, event.id, 2).await;
    assert_eq!(again.units.len(), 2);

    // Paying the expired order afterwards is refused.
    assert!(h.components.checkout.complete_payment(receipt.order_id).await.is_err());
}

#[tokio::test]
async fn paid_orders_are_never_touched() {
    let h = Harness::new();
    let event = h.event(&[("GA", 5000, 2)]).await;
    let user = h.user("cal@example.com", 0).await;
    let receipt = open(&h, user.id, event.id, 1).await;
    h.components.checkout.complete_payment(receipt.order_id).await.unwrap();

    h.clock.advance(Duration::hours(2));
    let report = h.components.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.stale, 0);

    let sold: Vec<_> = h
        .store
        .units(event.id)
        .await
        .into_iter()
        .filter(|u| u.sold)
        .collect();
    assert_eq!(sold.len(), 1);
    assert_eq!(sold[0].order_id, Some(receipt.order_id));
}

#[tokio::test]
async fn one_failing_order_does_not_stop_the_rest() {
    let h = Harness::new();
    let event = h.event(&[("GA", 5000, 3)]).await;
    let user = h.user("dan@example.com", 0).await;
    let broken = open(&h, user.id, event.id, 1).await;
    h.clock.advance(Duration::seconds(1));
    let healthy = open(&h, user.id, event.id, 1).await;

    h.store.fail_order_locks(broken.order_id).await;
    h.clock.advance(Duration::minutes(16));
    let report = h.components.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.stale, 2);
    assert_eq!(report.expired, 1);
    assert_eq!(report.failed, 1);

    let checkout = &h.components.checkout;
    let healthy = checkout.order_details(user.id, healthy.order_id).await.unwrap();
    assert_eq!(healthy.order.status, OrderStatus::Expired);
    let broken_details = checkout.order_details(user.id, broken.order_id).await.unwrap();
    assert_eq!(broken_details.order.status, OrderStatus::Pending);
    assert_eq!(broken_details.tickets.len(), 1);

    // Retried on the next pass once the fault clears.
    h.store.clear_faults().await;
    let report = h.components.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.expired, 1);
    assert!(h.store.units(event.id).await.iter().all(|u| u.is_available()));
}

#[tokio::test]
async fn payment_after_the_sweep_cutoff_but_before_the_sweep_wins() {
    let h = Harness::new();
    let event = h.event(&[("GA", 5000, 1)]).await;
    let user = h.user("ed@example.com", 0).await;
    let receipt = open(&h, user.id, event.id, 1).await;

    h.clock.advance(Duration::minutes(20));
    h.components.checkout.complete_payment(receipt.order_id).await.unwrap();

    let report = h.components.sweeper.sweep_once().await.unwrap();
    assert_eq!(report.expired, 0);
    assert!(h.store.units(event.id).await[0].sold);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_sweepers_expire_each_order_once() {
    let h = Harness::new();
    let event = h.event(&[("GA", 5000, 6)]).await;
    let user = h.user("flo@example.com", 0).await;
    for _ in 0..3 {
        open(&h, user.id, event.id, 2).await;
    }
    h.clock.advance(Duration::minutes(16));

    let a = Arc::clone(&h.components.sweeper);
    let b = Arc::clone(&h.components.sweeper);
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.sweep_once().await }),
        tokio::spawn(async move { b.sweep_once().await }),
    );
    let (ra, rb) = (ra.unwrap().unwrap(), rb.unwrap().unwrap());

    assert_eq!(ra.expired + rb.expired, 3);
    assert_eq!(ra.units_released + rb.units_released, 6);
    assert_eq!(ra.failed + rb.failed, 0);
    assert!(
        h.store
            .orders()
            .await
            .iter()
            .all(|o| o.status == OrderStatus::Expired)
    );
}

#[tokio::test]
async fn spawned_sweeper_runs_until_shutdown() {
    let h = Harness::new();
    let event = h.event(&[("GA", 5000, 1)]).await;
    let user = h.user("gia@example.com", 0).await;
    let receipt = open(&h, user.id, event.id, 1).await;
    h.clock.advance(Duration::minutes(16));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = Arc::clone(&h.components.sweeper).spawn(shutdown_rx);

    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        loop {
            let orders = h.store.orders().await;
            if orders
                .iter()
                .any(|o| o.id == receipt.order_id && o.status == OrderStatus::Expired)
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("sweeper should expire the order");

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("sweeper should stop")
        .unwrap();
}
