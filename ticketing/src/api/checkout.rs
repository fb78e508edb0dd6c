//! Checkout endpoints (require auth).
//!
//! - POST /checkout - Hold tickets and open a pending order awaiting payment
//! - POST /bookings/immediate - Buy tickets with no payment step
//!
//! # Checkout Flow
//!
//! 1. **Checkout**: units are claimed and the order is `pending`; the
//!    response carries the payment URL
//! 2. **Payment**: the gateway calls `POST /payments/webhook`
//! 3. **Paid**: units are sold and points are journaled
//! 4. **Abandoned**: the sweeper expires the order and releases the units

use crate::checkout::{CheckoutReceipt, CheckoutRequest, OrderDetails};
use crate::server::{AppError, AppState, AuthenticatedUser};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use boxoffice_core::types::{CheckoutItem, EventId};
use serde::Deserialize;

/// Immediate booking request.
#[derive(Debug, Deserialize)]
pub struct BookImmediateRequest {
    /// Event to book
    pub event_id: EventId,
    /// Category / tier
    pub category: String,
    /// Number of tickets
    pub quantity: u32,
}

/// Open a pending checkout.
///
/// ```bash
/// curl -X POST http://localhost:8080/checkout \
///   -H "x-user-id: 550e8400-e29b-41d4-a716-446655440000" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "event_id": "660e8400-e29b-41d4-a716-446655440001",
///     "items": [{"category": "GA", "quantity": 2}],
///     "redeem_points": 100
///   }'
/// ```
///
/// # Errors
///
/// 409 `INSUFFICIENT_STOCK` / `INSUFFICIENT_POINTS`, 422 for invalid
/// input, 503 if the store is busy.
pub async fn initiate_checkout(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckoutReceipt>), AppError> {
    let Json(request) = payload?;
    let receipt = state.checkout.initiate_checkout(user_id, request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Buy tickets in one step.
///
/// # Errors
///
/// As [`initiate_checkout`], minus the points checks.
pub async fn book_immediate(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(state): State<AppState>,
    payload: Result<Json<BookImmediateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderDetails>), AppError> {
    let Json(request) = payload?;
    let details = state
        .checkout
        .book_immediate(
            user_id,
            request.event_id,
            CheckoutItem::new(request.category, request.quantity),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(details)))
}
