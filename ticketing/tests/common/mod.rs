//! Shared harness: every component wired over one in-memory store, a manual
//! clock and a recording audit sink.

#![allow(dead_code)]

use boxoffice_core::types::{Event, User};
use boxoffice_testing::{fixtures, InMemoryTicketStore, ManualClock, RecordingAuditLog};
use std::sync::Arc;
use std::time::Duration;
use ticketing::{Components, MockPaymentGateway, PricingPolicy, SweeperSettings};

pub struct Harness {
    pub store: InMemoryTicketStore,
    pub clock: ManualClock,
    pub audit: RecordingAuditLog,
    pub components: Components,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_pricing(PricingPolicy::default())
    }

    pub fn with_pricing(pricing: PricingPolicy) -> Self {
        boxoffice_testing::init_test_tracing();
        let store = InMemoryTicketStore::new();
        let clock = ManualClock::starting_at_test_epoch();
        let audit = RecordingAuditLog::new();
        let components = Components::new(
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
            Arc::new(audit.clone()),
            MockPaymentGateway::shared("http://localhost:8080"),
            pricing,
            SweeperSettings {
                interval: Duration::from_millis(20),
                pending_timeout: Duration::from_secs(15 * 60),
                batch_size: 500,
            },
        );
        Self {
            store,
            clock,
            audit,
            components,
        }
    }

    /// Event with `(category, price_cents, quantity)` tiers.
    pub async fn event(&self, tiers: &[(&str, u64, u32)]) -> Event {
        fixtures::seed_event(&self.store, tiers).await.unwrap()
    }

    /// User holding `points`.
    pub async fn user(&self, email: &str, points: i64) -> User {
        fixtures::seed_user(&self.store, email, points).await.unwrap()
    }
}
