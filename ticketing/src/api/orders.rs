//! Order endpoints (require auth + ownership).
//!
//! - GET /orders/:id - Order with its tickets
//! - POST /orders/:id/cancel - Withdraw a pending order

use crate::checkout::OrderDetails;
use crate::server::{AppError, AppState, AuthenticatedUser};
use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};
use boxoffice_core::types::{OrderId, OrderStatus};
use serde::Serialize;
use uuid::Uuid;

/// Response after cancelling an order.
#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    /// Order
    pub order_id: OrderId,
    /// New status
    pub status: OrderStatus,
    /// Tickets returned to sale
    pub released: u64,
}

/// Get one of the caller's orders.
///
/// # Errors
///
/// 404 if the order does not exist or belongs to someone else.
pub async fn get_order(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<OrderDetails>, AppError> {
    let Path(id) = path?;
    let details = state
        .checkout
        .order_details(user_id, OrderId::from_uuid(id))
        .await?;
    Ok(Json(details))
}

/// Cancel one of the caller's pending orders.
///
/// # Errors
///
/// 404 as for [`get_order`], 409 `ORDER_NOT_CANCELLABLE` if it is no
/// longer pending.
pub async fn cancel_order(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<CancelOrderResponse>, AppError> {
    let Path(id) = path?;
    let order_id = OrderId::from_uuid(id);
    let released = state.checkout.cancel_order(user_id, order_id).await?;
    Ok(Json(CancelOrderResponse {
        order_id,
        status: OrderStatus::Cancelled,
        released,
    }))
}
