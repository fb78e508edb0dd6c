//! # Boxoffice Core
//!
//! Domain types and capability traits for the boxoffice ticketing core.
//!
//! This crate carries no I/O. It defines:
//!
//! - **Types**: events, ticket units, orders, users and point ledger entries
//! - **Money**: integer minor-unit amounts
//! - **Errors**: the store failure classes and the ticketing error taxonomy
//! - **Store traits**: per-aggregate transaction capabilities
//!   (`InventoryTx`, `OrderTx`, `PointsTx`) composed into a `StoreTransaction`
//! - **Environment**: the `Clock` abstraction
//! - **Audit**: the fire-and-forget `AuditLog` sink
//!
//! ## Unit lifecycle
//!
//! ```text
//! available ──claim──▶ reserved(order pending) ──finalize──▶ sold ──scan──▶ checked-in
//!     ▲                        │
//!     └────expire / cancel─────┘
//! ```
//!
//! Implementations live in `boxoffice-postgres` (production) and
//! `boxoffice-testing` (in-memory, for tests).

pub mod audit;
pub mod environment;
pub mod error;
pub mod money;
pub mod store;
pub mod types;

pub use chrono::{DateTime, Utc};
pub use error::{StoreError, TicketingError};
pub use money::Money;
pub use types::*;
