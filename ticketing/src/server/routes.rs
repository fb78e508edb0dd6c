//! Router configuration.

use super::health::health_check;
use super::state::AppState;
use crate::api::{checkout, events, orders, payments, tickets, users};
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Routes:
/// - Health check
/// - Users and points
/// - Checkout, immediate booking, orders
/// - Payment webhook
/// - Door check-in
/// - Events and inventory
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        // Users
        .route("/users", post(users::register_user))
        .route("/users/me/points", get(users::point_history))
        // Checkout
        .route("/checkout", post(checkout::initiate_checkout))
        .route("/bookings/immediate", post(checkout::book_immediate))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        // Payment gateway callback
        .route("/payments/webhook", post(payments::payment_webhook))
        // Door
        .route("/tickets/:id/checkin", patch(tickets::check_in))
        .route("/tickets/checkin/bulk", post(tickets::bulk_check_in))
        // Catalog
        .route("/events", post(events::create_event))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id/inventory", get(events::event_inventory))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
