//! Door check-in endpoints.
//!
//! - PATCH /tickets/:id/checkin - Scan one ticket
//! - POST /tickets/checkin/bulk - Scan many tickets, each independently
//!
//! The `x-user-id` header, when present, is recorded as the operator.

use crate::checkin::ScanOutcome;
use crate::server::{AppError, AppState, AuthenticatedUser};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use boxoffice_core::types::{EventId, TicketUnit, UnitId};
use serde::{Deserialize, Serialize};

/// Single scan request.
#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    /// Event being admitted
    pub event_id: EventId,
}

/// Bulk scan request.
#[derive(Debug, Deserialize)]
pub struct BulkCheckInRequest {
    /// Event being admitted
    pub event_id: EventId,
    /// Tickets to scan, in order
    pub ticket_ids: Vec<UnitId>,
}

/// Single scan response.
#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    /// Always `admitted`
    pub result: &'static str,
    /// The ticket, now stamped
    pub ticket: TicketUnit,
}

/// Bulk scan response.
#[derive(Debug, Serialize)]
pub struct BulkCheckInResponse {
    /// Tickets admitted
    pub admitted: usize,
    /// Tickets rejected
    pub rejected: usize,
    /// Per-ticket results, in request order
    pub results: Vec<ScanOutcome>,
}

/// Scan one ticket.
///
/// ```bash
/// curl -X PATCH http://localhost:8080/tickets/42/checkin \
///   -H "Content-Type: application/json" \
///   -d '{"event_id": "660e8400-e29b-41d4-a716-446655440001"}'
/// ```
///
/// # Errors
///
/// 403 `UNPAID_TICKET` / `WRONG_EVENT`, 409 `ALREADY_USED` (the message
/// says how long ago), 404 for an unknown ticket.
pub async fn check_in(
    operator: Option<AuthenticatedUser>,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CheckInRequest>, JsonRejection>,
) -> Result<Json<CheckInResponse>, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let ticket = state
        .desk
        .scan(operator.map(|o| o.0), UnitId::new(id), request.event_id)
        .await?;
    Ok(Json(CheckInResponse {
        result: "admitted",
        ticket,
    }))
}

/// Scan several tickets.
///
/// # Errors
///
/// 422 for an empty ticket list. Individual rejections are reported in
/// `results`, not as an error.
pub async fn bulk_check_in(
    operator: Option<AuthenticatedUser>,
    State(state): State<AppState>,
    payload: Result<Json<BulkCheckInRequest>, JsonRejection>,
) -> Result<Json<BulkCheckInResponse>, AppError> {
    let Json(request) = payload?;
    if request.ticket_ids.is_empty() {
        return Err(AppError::validation("ticket_ids must not be empty"));
    }
    let results = state
        .desk
        .scan_many(operator.map(|o| o.0), &request.ticket_ids, request.event_id)
        .await;
    let admitted = results.iter().filter(|r| r.admitted).count();
    Ok(Json(BulkCheckInResponse {
        admitted,
        rejected: results.len() - admitted,
        results,
    }))
}
