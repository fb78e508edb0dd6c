//! Wiring of the ticketing components.
//!
//! Every component shares the same store, clock and audit sink; the checkout
//! orchestrator and the sweeper share the same order ledger.

use crate::catalog::Catalog;
use crate::checkin::CheckInDesk;
use crate::checkout::Checkout;
use crate::orders::OrderLedger;
use crate::payment_gateway::PaymentGateway;
use crate::points::PricingPolicy;
use crate::server::{build_router, AppState};
use crate::sweeper::{ExpirySweeper, SweeperSettings};
use boxoffice_core::audit::AuditLog;
use boxoffice_core::environment::Clock;
use boxoffice_core::store::TicketStore;
use std::sync::Arc;

/// The wired components.
#[derive(Clone)]
pub struct Components {
    /// Checkout orchestrator
    pub checkout: Arc<Checkout>,
    /// Door check-in
    pub desk: Arc<CheckInDesk>,
    /// Catalog boundary
    pub catalog: Arc<Catalog>,
    /// Expiry sweeper
    pub sweeper: Arc<ExpirySweeper>,
}

impl Components {
    /// Wire every component over `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditLog>,
        gateway: Arc<dyn PaymentGateway>,
        pricing: PricingPolicy,
        sweeper: SweeperSettings,
    ) -> Self {
        let ledger = Arc::new(OrderLedger::new(pricing, gateway));
        Self {
            checkout: Arc::new(Checkout::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&ledger),
                Arc::clone(&audit),
            )),
            desk: Arc::new(CheckInDesk::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&audit),
            )),
            catalog: Arc::new(Catalog::new(Arc::clone(&store), Arc::clone(&clock))),
            sweeper: Arc::new(ExpirySweeper::new(store, clock, ledger, audit, sweeper)),
        }
    }

    /// HTTP handler state.
    #[must_use]
    pub fn app_state(&self) -> AppState {
        AppState::new(
            Arc::clone(&self.checkout),
            Arc::clone(&self.desk),
            Arc::clone(&self.catalog),
        )
    }

    /// The HTTP router over these components.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        build_router(self.app_state())
    }
}
