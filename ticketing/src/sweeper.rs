//! Expiry sweeper.
//!
//! A periodic task that expires pending orders older than the configured
//! timeout and returns their units to the pool. It holds no in-memory state:
//! each pass re-reads the stale set from the store, and each order is expired
//! in its own transaction behind the pending-status guard, so any number of
//! sweeper instances can run side by side with live checkouts.

use crate::metrics;
use crate::orders::{ExpireOutcome, OrderLedger};
use crate::transaction;
use boxoffice_core::audit::{AuditLog, AuditRecord};
use boxoffice_core::environment::Clock;
use boxoffice_core::error::TicketingError;
use boxoffice_core::store::TicketStore;
use boxoffice_core::types::OrderId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Sweeper timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweeperSettings {
    /// Time between passes
    pub interval: Duration,
    /// Age after which a pending order is stale
    pub pending_timeout: Duration,
    /// Maximum orders expired per pass
    pub batch_size: u32,
}

impl Default for SweeperSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            pending_timeout: Duration::from_secs(15 * 60),
            batch_size: 500,
        }
    }
}

/// Outcome of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Stale orders found
    pub stale: u64,
    /// Orders expired by this pass
    pub expired: u64,
    /// Orders that had already left `pending` by the time they were locked
    pub skipped: u64,
    /// Orders whose expiry failed; retried next pass
    pub failed: u64,
    /// Units returned to the pool
    pub units_released: u64,
}

/// The expiry sweeper.
pub struct ExpirySweeper {
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
    ledger: Arc<OrderLedger>,
    audit: Arc<dyn AuditLog>,
    settings: SweeperSettings,
}

impl ExpirySweeper {
    /// Create a sweeper.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        clock: Arc<dyn Clock>,
        ledger: Arc<OrderLedger>,
        audit: Arc<dyn AuditLog>,
        settings: SweeperSettings,
    ) -> Self {
        Self {
            store,
            clock,
            ledger,
            audit,
            settings,
        }
    }

    /// Run one pass.
    ///
    /// Per-order failures are counted and logged; they never abort the rest
    /// of the batch.
    ///
    /// # Errors
    ///
    /// Only if the stale-order query itself fails.
    pub async fn sweep_once(&self) -> Result<SweepReport, TicketingError> {
        let started = Instant::now();
        let now = self.clock.now();
        let timeout = chrono::Duration::from_std(self.settings.pending_timeout)
            .map_err(|e| TicketingError::InvalidRequest(format!("pending timeout: {e}")))?;
        let cutoff = now - timeout;

        let stale = self
            .store
            .stale_pending_orders(cutoff, self.settings.batch_size)
            .await?;
        let mut report = SweepReport {
            stale: stale.len() as u64,
            ..SweepReport::default()
        };

        for order_id in stale {
            match self.expire_one(order_id).await {
                Ok(ExpireOutcome::Expired { released }) => {
                    report.expired += 1;
                    report.units_released += released;
                    metrics::record_order_released("expired", released);
                },
                Ok(ExpireOutcome::Skipped { .. }) => report.skipped += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(order_id = %order_id, error = %err, "Failed to expire order");
                },
            }
        }

        metrics::record_sweep(report.failed, started.elapsed().as_secs_f64());
        if report.stale > 0 {
            tracing::info!(
                stale = report.stale,
                expired = report.expired,
                skipped = report.skipped,
                failed = report.failed,
                units_released = report.units_released,
                "Sweep complete"
            );
        }
        if report.expired > 0 {
            self.audit.record(AuditRecord::new(
                None,
                "orders.expired",
                "sweeper",
                format!(
                    "{} orders expired, {} tickets released",
                    report.expired, report.units_released
                ),
            ));
        }
        Ok(report)
    }

    async fn expire_one(&self, order_id: OrderId) -> Result<ExpireOutcome, TicketingError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let result = self.ledger.expire(&mut *tx, order_id, now).await;
        transaction::finish(tx, result).await
    }

    /// Run passes on the configured interval until `shutdown` fires.
    #[must_use]
    pub fn spawn(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.settings.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!(
                interval_secs = self.settings.interval.as_secs(),
                timeout_secs = self.settings.pending_timeout.as_secs(),
                "Expiry sweeper started"
            );

            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        tracing::info!("Expiry sweeper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(err) = self.sweep_once().await {
                            tracing::warn!(error = %err, "Sweep failed");
                        }
                    }
                }
            }
        })
    }
}
