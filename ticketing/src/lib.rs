//! Ticketing core - seat inventory, checkout, loyalty points and door check-in.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum)            payment webhook          interval timer
//!       │                        │                        │
//!       ▼                        ▼                        ▼
//! ┌──────────────┐       ┌──────────────┐        ┌──────────────┐
//! │   Checkout   │       │   Checkout   │        │    Expiry    │
//! │   (open)     │       │  (finalize)  │        │   Sweeper    │
//! └──────────────┘       └──────────────┘        └──────────────┘
//!        │                       │                        │
//!        └──────── Order Ledger ─┴── Points Ledger ───────┘
//!                        │
//!                   Allocator
//!                        │
//!                        ▼
//!              ┌──────────────────┐
//!              │  TicketStore     │  one transaction per operation,
//!              │  (PostgreSQL)    │  row locks are the only mutex
//!              └──────────────────┘
//! ```
//!
//! # Key Guarantees
//!
//! ## 1. No Oversell
//!
//! The allocator selects units `ORDER BY id LIMIT n FOR UPDATE`. Two checkouts
//! racing for the last unit serialize on its row lock; the loser re-reads and
//! fails with `InsufficientStock`. Nothing is held in process memory, so the
//! guarantee holds across server instances.
//!
//! ## 2. Idempotent Finalize
//!
//! Finalize, expire and cancel lock the order row and re-check `pending`
//! under the lock. A redelivered payment webhook, or a sweeper racing a
//! payment, finds a terminal status and changes nothing.
//!
//! ## 3. Ledger-Balance Invariant
//!
//! Every balance change is an append-only ledger entry written in the same
//! statement as an atomic increment of the cached balance, so
//! `balance == Σ entries` for every user.
//!
//! # Order Flow
//!
//! ```text
//! checkout ──▶ pending ──webhook──▶ paid ──scan──▶ checked in
//!                 │
//!                 ├──sweeper (timeout)──▶ expired   (units released)
//!                 └──customer───────────▶ cancelled (units released)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod allocator;
pub mod api;
pub mod audit;
pub mod bootstrap;
pub mod catalog;
pub mod checkin;
pub mod checkout;
pub mod config;
pub mod metrics;
pub mod orders;
pub mod payment_gateway;
pub mod points;
pub mod runtime;
pub mod server;
pub mod sweeper;
pub mod transaction;

pub use bootstrap::{ApplicationBuilder, Components};
pub use catalog::{Catalog, EventInventory};
pub use checkin::{CheckInDesk, ScanOutcome};
pub use checkout::{Checkout, CheckoutReceipt, CheckoutRequest, OrderDetails};
pub use config::Config;
pub use orders::{
    BookedOrder, ExpireOutcome, FinalizedOrder, OpenOrder, OpenedOrder, OrderLedger,
};
pub use payment_gateway::{MockPaymentGateway, PaymentGateway, PaymentReference};
pub use points::{PointsLedger, PricingPolicy, Quote};
pub use runtime::Application;
pub use sweeper::{ExpirySweeper, SweepReport, SweeperSettings};
