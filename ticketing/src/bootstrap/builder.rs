//! Declarative application builder API.
//!
//! 1. Configure
//! 2. Initialize infrastructure (database, migrations)
//! 3. Wire components and build the HTTP server
//! 4. Run (sweeper + server, graceful shutdown)
//!
//! ```rust,ignore
//! ApplicationBuilder::new()
//!     .with_config(Config::from_env())
//!     .with_resources().await?
//!     .build().await?
//!     .run().await?;
//! ```

use crate::bootstrap::{Components, ResourceManager};
use crate::config::Config;
use crate::runtime::Application;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Fluent builder for the ticketing [`Application`].
#[derive(Default)]
pub struct ApplicationBuilder {
    config: Option<Arc<Config>>,
    resources: Option<ResourceManager>,
}

impl ApplicationBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    /// Use already-initialized resources (tests, alternative stores).
    #[must_use]
    pub fn with_resource_manager(mut self, resources: ResourceManager) -> Self {
        self.config = Some(Arc::clone(&resources.config));
        self.resources = Some(resources);
        self
    }

    /// Connect the database and run migrations.
    ///
    /// # Errors
    ///
    /// Returns error if config is missing or the database is unreachable.
    pub async fn with_resources(mut self) -> anyhow::Result<Self> {
        let config = self
            .config
            .clone()
            .context("Config must be set before initializing resources")?;
        self.resources = Some(ResourceManager::from_config(config).await?);
        Ok(self)
    }

    /// Wire components, bind the listener and return a runnable application.
    ///
    /// # Errors
    ///
    /// Returns error if resources are missing or the address cannot be bound.
    pub async fn build(self) -> anyhow::Result<Application> {
        let resources = self
            .resources
            .context("Resources must be initialized before building")?;
        let config = Arc::clone(&resources.config);

        let components = Components::new(
            resources.store,
            resources.clock,
            resources.audit,
            resources.payment_gateway,
            config.checkout,
            config.sweeper_settings(),
        );

        let address = config.bind_address();
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .with_context(|| format!("failed to bind {address}"))?;
        info!(%address, "Listener bound");

        Ok(Application::new(
            listener,
            components.router(),
            components.sweeper,
            Duration::from_secs(config.server.shutdown_timeout),
        ))
    }
}
