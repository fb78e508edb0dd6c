//! Application state for the HTTP server.

use crate::catalog::Catalog;
use crate::checkin::CheckInDesk;
use crate::checkout::Checkout;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Checkout, payment, booking, cancellation and points
    pub checkout: Arc<Checkout>,
    /// Door scanning
    pub desk: Arc<CheckInDesk>,
    /// Events and inventory
    pub catalog: Arc<Catalog>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(checkout: Arc<Checkout>, desk: Arc<CheckInDesk>, catalog: Arc<Catalog>) -> Self {
        Self {
            checkout,
            desk,
            catalog,
        }
    }
}
