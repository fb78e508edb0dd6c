//! Resource management for infrastructure setup.
//!
//! 1. Connect the `PostgreSQL` pool (statement and lock timeouts applied)
//! 2. Run the embedded migrations
//! 3. Initialize shared services (clock, audit sink, payment gateway)

use crate::audit::TracingAuditLog;
use crate::config::Config;
use crate::payment_gateway::{MockPaymentGateway, PaymentGateway};
use boxoffice_core::audit::AuditLog;
use boxoffice_core::environment::{Clock, SystemClock};
use boxoffice_core::store::TicketStore;
use boxoffice_postgres::{PostgresAuditLog, PostgresTicketStore};
use std::sync::Arc;
use tracing::info;

/// Infrastructure resources shared by every component.
#[derive(Clone)]
pub struct ResourceManager {
    /// Application configuration
    pub config: Arc<Config>,

    /// System clock for timestamps
    pub clock: Arc<dyn Clock>,

    /// Durable ticket store
    pub store: Arc<dyn TicketStore>,

    /// Audit sink
    pub audit: Arc<dyn AuditLog>,

    /// Payment gateway (mock in development)
    pub payment_gateway: Arc<dyn PaymentGateway>,
}

impl ResourceManager {
    /// Initialize all infrastructure resources from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the database connection or migrations fail.
    pub async fn from_config(config: Arc<Config>) -> anyhow::Result<Self> {
        info!("Connecting to database...");
        let store = PostgresTicketStore::connect(&config.to_postgres_settings()).await?;

        info!("Running migrations...");
        store.migrate().await?;

        let audit: Arc<dyn AuditLog> = if config.audit.database {
            Arc::new(PostgresAuditLog::new(store.pool().clone()))
        } else {
            info!("Audit records go to the log only");
            Arc::new(TracingAuditLog)
        };
        let payment_gateway = MockPaymentGateway::shared(config.payment.base_url.clone());

        info!("All resources initialized successfully");
        Ok(Self {
            config,
            clock: Arc::new(SystemClock),
            store: Arc::new(store),
            audit,
            payment_gateway,
        })
    }
}
