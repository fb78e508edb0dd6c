//! `PostgreSQL` ticket store for boxoffice.
//!
//! Implements the store capability traits from `boxoffice-core` on top of
//! sqlx. Every [`StoreTransaction`](boxoffice_core::store::StoreTransaction)
//! is one database transaction:
//!
//! - Allocation uses `SELECT ... ORDER BY id LIMIT n FOR UPDATE`, so two
//!   checkouts racing for the same units serialize on the row locks
//! - Finalize, expire and cancel lock the order row with `FOR UPDATE`
//! - Point balances change through a single `UPDATE ... SET points_balance =
//!   points_balance + $n` chained to the ledger insert
//! - Lock waits are bounded by a transaction-local `lock_timeout`; a timeout
//!   surfaces as [`StoreError::Transient`](boxoffice_core::StoreError::Transient)
//!
//! # Example
//!
//! ```ignore
//! use boxoffice_postgres::{PostgresSettings, PostgresTicketStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresTicketStore::connect(&PostgresSettings::new("postgres://localhost/tix")).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod audit;
mod error;
mod rows;
mod store;
mod transaction;

pub use audit::PostgresAuditLog;
pub use error::classify;
pub use store::{PostgresSettings, PostgresTicketStore};
pub use transaction::PostgresTransaction;
