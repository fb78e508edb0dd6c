//! User endpoints.
//!
//! - POST /users - Register (credits the signup bonus)
//! - GET /users/me/points - Balance and recent ledger entries (requires auth)

use crate::server::{AppError, AppState, AuthenticatedUser};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use boxoffice_core::types::{PointEntry, User, UserId};
use serde::{Deserialize, Serialize};

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    /// Display name
    pub name: String,
    /// Email address (unique)
    pub email: String,
}

/// Query string of the history endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Maximum entries to return (default 50)
    pub limit: Option<u32>,
}

/// Point history response.
#[derive(Debug, Serialize)]
pub struct PointHistoryResponse {
    /// Account
    pub user_id: UserId,
    /// Current balance
    pub balance: i64,
    /// Newest first
    pub entries: Vec<PointEntry>,
}

/// Register a user.
///
/// ```bash
/// curl -X POST http://localhost:8080/users \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Ana", "email": "ana@example.com"}'
/// ```
///
/// # Errors
///
/// 422 for invalid input, 409 if the email is taken.
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(request) = payload?;
    let user = state.checkout.register_user(&request.name, &request.email).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// The caller's balance and point history.
///
/// # Errors
///
/// 401 without a user id, 404 for an unknown user.
pub async fn point_history(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<PointHistoryResponse>, AppError> {
    let (user, entries) = state.checkout.point_history(user_id, query.limit).await?;
    Ok(Json(PointHistoryResponse {
        user_id: user.id,
        balance: user.points_balance,
        entries,
    }))
}
