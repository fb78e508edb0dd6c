//! Concurrent checkouts never oversell and never leave partial claims.
//!
//! Run with: `cargo test --test concurrency_stress_test`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use boxoffice_core::error::TicketingError;
use boxoffice_core::types::{CheckoutItem, OrderStatus};
use common::Harness;
use std::collections::HashSet;
use std::sync::Arc;
use ticketing::CheckoutRequest;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_contenders_for_the_last_units() {
    let h = Harness::new();
    let event = h.event(&[("GA", 5000, 2)]).await;
    let a = h.user("a@example.com", 0).await;
    let b = h.user("b@example.com", 0).await;

    let checkout_a = Arc::clone(&h.components.checkout);
    let checkout_b = Arc::clone(&h.components.checkout);
    let req = |quantity| CheckoutRequest {
        event_id: event.id,
        items: vec![CheckoutItem::new("GA", quantity)],
        redeem_points: 0,
    };
    let (req_a, req_b) = (req(2), req(1));

    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { checkout_a.initiate_checkout(a.id, req_a).await }),
        tokio::spawn(async move { checkout_b.initiate_checkout(b.id, req_b).await }),
    );
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    // Either order can win: 2 then 1 fails, or 1 then 2 fails.
    assert!(ra.is_ok() ^ rb.is_ok(), "exactly one checkout must succeed");
    let failure = if ra.is_err() { ra.unwrap_err() } else { rb.unwrap_err() };
    assert!(matches!(failure, TicketingError::InsufficientStock { .. }));

    let reserved = h
        .store
        .units(event.id)
        .await
        .into_iter()
        .filter(|u| !u.is_available())
        .count();
    let pending: usize = h
        .store
        .orders()
        .await
        .iter()
        .filter(|o| o.status == OrderStatus::Pending)
        .count();
    assert_eq!(pending, 1);
    assert!(reserved == 1 || reserved == 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn many_buyers_never_oversell() {
    const STOCK: u32 = 25;
    const BUYERS: usize = 40;

    let h = Harness::new();
    let event = h.event(&[("GA", 1000, STOCK), ("VIP", 5000, 5)]).await;

    let mut handles = Vec::with_capacity(BUYERS);
    for i in 0..BUYERS {
        let user = h.user(&format!("buyer{i}@example.com"), 0).await;
        let checkout = Arc::clone(&h.components.checkout);
        let event_id = event.id;
        handles.push(tokio::spawn(async move {
            let mut items = vec![CheckoutItem::new("GA", 1 + (i % 2) as u32)];
            if i % 5 == 0 {
                items.push(CheckoutItem::new("VIP", 2));
            }
            let receipt = checkout
                .initiate_checkout(
                    user.id,
                    CheckoutRequest {
                        event_id,
                        items,
                        redeem_points: 0,
                    },
                )
                .await?;
            if i % 3 == 0 {
                checkout.complete_payment(receipt.order_id).await?;
            }
            Ok::<_, TicketingError>(receipt)
        }));
    }

    let mut claimed = HashSet::new();
    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => {
                winners += 1;
                for unit in receipt.units {
                    assert!(claimed.insert(unit.id), "unit {} claimed twice", unit.id);
                }
            },
            Err(err) => assert!(
                matches!(err, TicketingError::InsufficientStock { .. }),
                "unexpected error: {err}"
            ),
        }
    }
    assert!(winners > 0);

    let units = h.store.units(event.id).await;
    let held = units.iter().filter(|u| !u.is_available()).count();
    assert_eq!(held, claimed.len());
    let ga_held = units
        .iter()
        .filter(|u| u.category == "GA" && !u.is_available())
        .count();
    assert!(ga_held <= STOCK as usize);

    // Every held unit belongs to a live order of the right size.
    let orders = h.store.orders().await;
    for order in &orders {
        let owned = units.iter().filter(|u| u.order_id == Some(order.id)).count();
        assert!(owned > 0, "order {} holds no units", order.id);
        assert!(!order.status.is_terminal() || order.status == OrderStatus::Paid);
    }
}
