//! Payment gateway callback.
//!
//! - POST /payments/webhook - Form-encoded `order_id` and `paid`
//!
//! The gateway delivers at least once. Responses are chosen so that
//! redelivery stops when retrying cannot help:
//!
//! | Outcome                         | Status |
//! |---------------------------------|--------|
//! | finalized now                   | 200    |
//! | already finalized / not pending | 200    |
//! | `paid=false`                    | 200    |
//! | unknown order                   | 404    |
//! | store busy                      | 503    |
//!
//! The callback is not authenticated. A real gateway integration must
//! verify the request signature before trusting it.

use crate::server::{AppError, AppState};
use axum::{
    extract::{rejection::FormRejection, State},
    Form, Json,
};
use boxoffice_core::error::TicketingError;
use boxoffice_core::types::{OrderId, OrderStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Callback body.
#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    /// Order the payment is for
    pub order_id: Uuid,
    /// Whether the customer paid
    pub paid: bool,
}

/// Callback acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Order
    pub order_id: OrderId,
    /// `paid`, `already_processed` or `ignored`
    pub result: &'static str,
    /// Order status after the callback, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

/// Handle a payment confirmation.
///
/// # Errors
///
/// 404 for an unknown order, 503 when the store is busy (the gateway
/// retries), 500 otherwise.
pub async fn payment_webhook(
    State(state): State<AppState>,
    payload: Result<Form<PaymentWebhook>, FormRejection>,
) -> Result<Json<WebhookResponse>, AppError> {
    let Form(webhook) = payload?;
    let order_id = OrderId::from_uuid(webhook.order_id);

    if !webhook.paid {
        tracing::info!(order_id = %order_id, "Unpaid callback ignored");
        return Ok(Json(WebhookResponse {
            order_id,
            result: "ignored",
            status: None,
        }));
    }

    match state.checkout.complete_payment(order_id).await {
        Ok(finalized) => Ok(Json(WebhookResponse {
            order_id,
            result: "paid",
            status: Some(finalized.order.status),
        })),
        Err(TicketingError::OrderNotFinalizable { status, .. }) => Ok(Json(WebhookResponse {
            order_id,
            result: "already_processed",
            status: Some(status),
        })),
        Err(err) => Err(err.into()),
    }
}
