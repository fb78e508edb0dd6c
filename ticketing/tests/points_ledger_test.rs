//! Point balances always equal the sum of their ledger entries, whatever
//! mix of checkouts, payments, cancellations and expiries produced them.
//!
//! Run with: `cargo test --test points_ledger_test`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use boxoffice_core::money::Money;
use boxoffice_core::types::CheckoutItem;
use common::Harness;
use proptest::prelude::*;
use ticketing::{CheckoutRequest, PricingPolicy};

#[derive(Debug, Clone, Copy)]
enum Settle {
    Pay,
    Cancel,
    Abandon,
}

#[derive(Debug, Clone, Copy)]
struct Step {
    quantity: u32,
    redeem_percent: u8,
    settle: Settle,
}

fn step() -> impl Strategy<Value = Step> {
    (
        1u32..=3,
        0u8..=120,
        prop_oneof![Just(Settle::Pay), Just(Settle::Cancel), Just(Settle::Abandon)],
    )
        .prop_map(|(quantity, redeem_percent, settle)| Step {
            quantity,
            redeem_percent,
            settle,
        })
}

async fn replay(steps: Vec<Step>, start: i64) -> (i64, i64, i64) {
    let h = Harness::new();
    let event = h.event(&[("GA", 2500, 40)]).await;
    let user = h.user("prop@example.com", start).await;
    let checkout = &h.components.checkout;

    for step in steps {
        let (account, _) = checkout.point_history(user.id, None).await.unwrap();
        // Percentages above 100 ask for more than the balance and must fail.
        let redeem = account.points_balance * i64::from(step.redeem_percent) / 100;
        let opened = checkout
            .initiate_checkout(
                user.id,
                CheckoutRequest {
                    event_id: event.id,
                    items: vec![CheckoutItem::new("GA", step.quantity)],
                    redeem_points: redeem,
                },
            )
            .await;
        let Ok(receipt) = opened else {
            assert!(redeem > account.points_balance);
            continue;
        };
        match step.settle {
            Settle::Pay => {
                checkout.complete_payment(receipt.order_id).await.unwrap();
            },
            Settle::Cancel => {
                checkout.cancel_order(user.id, receipt.order_id).await.unwrap();
            },
            Settle::Abandon => {
                h.clock.advance(chrono::Duration::minutes(16));
                h.components.sweeper.sweep_once().await.unwrap();
            },
        }
    }

    let (account, _) = checkout.point_history(user.id, None).await.unwrap();
    let entries = h.store.entries(user.id).await;
    let last_balance_after = entries.last().map_or(0, |e| e.balance_after);
    (
        account.points_balance,
        h.store.ledger_sum(user.id).await,
        last_balance_after,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn balance_matches_ledger_sum(
        steps in prop::collection::vec(step(), 1..12),
        start in 0i64..2_000,
    ) {
        let (balance, sum, last) = tokio_test::block_on(replay(steps, start));
        prop_assert_eq!(balance, sum);
        prop_assert_eq!(balance, last);
        prop_assert!(balance >= 0);
    }

    #[test]
    fn quote_never_goes_below_zero_and_earns_on_the_total(
        subtotal in 0u64..10_000_000,
        points in 0i64..2_000_000,
    ) {
        let quote = PricingPolicy::default().quote(Money::from_cents(subtotal), points);
        prop_assert_eq!(quote.subtotal.cents(), subtotal);
        prop_assert_eq!(quote.total, Money::from_cents(subtotal).saturating_sub(quote.discount));
        prop_assert!(quote.total.cents() <= subtotal);
        prop_assert_eq!(quote.points_earned, i64::try_from(quote.total.cents() / 10).unwrap());
    }
}
