//! Catalog boundary.
//!
//! Event management proper lives outside the ticketing core. This is the
//! narrow slice the core needs: publishing an event together with its
//! generated stock, and reading an event and its per-category inventory.

use crate::metrics;
use boxoffice_core::environment::Clock;
use boxoffice_core::error::TicketingError;
use boxoffice_core::store::TicketStore;
use boxoffice_core::types::{CategoryStock, Event, EventId, NewEvent};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// An event with its stock counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventInventory {
    /// The event
    pub event: Event,
    /// One row per category, sorted by category
    pub categories: Vec<CategoryStock>,
}

/// Catalog reads and stock generation.
pub struct Catalog {
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
}

impl Catalog {
    /// Create a catalog.
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Insert an event and generate its units in one transaction.
    ///
    /// # Errors
    ///
    /// [`TicketingError::InvalidRequest`] for a blank name, no tiers, a
    /// blank or repeated category, or a zero quantity.
    pub async fn publish_event(&self, mut event: NewEvent) -> Result<(Event, u64), TicketingError> {
        validate(&event)?;
        for tier in &mut event.tiers {
            tier.category = tier.category.trim().to_string();
        }
        let (event, units) = self
            .store
            .create_event_with_stock(event, self.clock.now())
            .await?;

        metrics::record_event_created();
        tracing::info!(event_id = %event.id, name = %event.name, units, "Event published");
        Ok((event, units))
    }

    /// Look up an event.
    ///
    /// # Errors
    ///
    /// [`TicketingError::EventNotFound`].
    pub async fn event(&self, event_id: EventId) -> Result<Event, TicketingError> {
        self.store
            .event(event_id)
            .await?
            .ok_or(TicketingError::EventNotFound(event_id))
    }

    /// Per-category stock counts for an event.
    ///
    /// # Errors
    ///
    /// [`TicketingError::EventNotFound`].
    pub async fn inventory(&self, event_id: EventId) -> Result<EventInventory, TicketingError> {
        let event = self.event(event_id).await?;
        let categories = self.store.inventory_summary(event_id).await?;
        let available = categories.iter().map(|c| c.available).sum();
        metrics::update_tickets_available(&event_id.to_string(), available);
        Ok(EventInventory { event, categories })
    }
}

fn validate(event: &NewEvent) -> Result<(), TicketingError> {
    if event.name.trim().is_empty() {
        return Err(TicketingError::InvalidRequest("event name must not be blank".into()));
    }
    if event.tiers.is_empty() {
        return Err(TicketingError::InvalidRequest("at least one tier is required".into()));
    }
    let mut seen = HashSet::new();
    for tier in &event.tiers {
        let category = tier.category.trim();
        if category.is_empty() {
            return Err(TicketingError::InvalidRequest("category must not be blank".into()));
        }
        if tier.quantity == 0 {
            return Err(TicketingError::InvalidRequest(format!(
                "tier '{category}' must have at least one unit"
            )));
        }
        if !seen.insert(category) {
            return Err(TicketingError::InvalidRequest(format!(
                "tier '{category}' is listed twice"
            )));
        }
    }
    Ok(())
}
