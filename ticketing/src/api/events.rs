//! Catalog endpoints.
//!
//! - POST /events - Publish an event and generate its stock
//! - GET /events/:id - Event details
//! - GET /events/:id/inventory - Per-category stock counts

use crate::catalog::EventInventory;
use crate::server::{AppError, AppState};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use boxoffice_core::types::{Event, EventId, NewEvent};
use serde::Serialize;
use uuid::Uuid;

/// Response after publishing an event.
#[derive(Debug, Serialize)]
pub struct CreateEventResponse {
    /// The event
    pub event: Event,
    /// Units generated
    pub units_created: u64,
}

/// Publish an event with its stock.
///
/// ```bash
/// curl -X POST http://localhost:8080/events \
///   -H "Content-Type: application/json" \
///   -d '{
///     "name": "Neptune Live",
///     "venue": "Hall A",
///     "date": "2025-06-01T20:00:00Z",
///     "description": "",
///     "tiers": [{"category": "GA", "price": 5000, "quantity": 200}]
///   }'
/// ```
///
/// # Errors
///
/// 422 for invalid tiers.
pub async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<NewEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateEventResponse>), AppError> {
    let Json(request) = payload?;
    let (event, units_created) = state.catalog.publish_event(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse {
            event,
            units_created,
        }),
    ))
}

/// Get an event.
///
/// # Errors
///
/// 404 for an unknown event.
pub async fn get_event(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Event>, AppError> {
    let Path(id) = path?;
    Ok(Json(state.catalog.event(EventId::from_uuid(id)).await?))
}

/// Stock counts per category.
///
/// # Errors
///
/// 404 for an unknown event.
pub async fn event_inventory(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<EventInventory>, AppError> {
    let Path(id) = path?;
    Ok(Json(state.catalog.inventory(EventId::from_uuid(id)).await?))
}
