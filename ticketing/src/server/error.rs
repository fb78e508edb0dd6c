//! HTTP error type.
//!
//! Bridges [`TicketingError`] and extractor rejections to JSON error
//! responses. Clients branch on `code`; `message` is for humans and carries
//! the actionable detail (which category ran short, the point balance, how
//! long ago a ticket was scanned).

use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use boxoffice_core::error::TicketingError;
use serde::Serialize;
use std::fmt;

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
            source: None,
        }
    }

    /// Attach a source error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{resource} with id {id} not found"),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, message)
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", message)
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<TicketingError> for AppError {
    fn from(err: TicketingError) -> Self {
        let message = err.to_string();
        match err {
            TicketingError::InsufficientStock { .. } => {
                Self::conflict("INSUFFICIENT_STOCK", message)
            },
            TicketingError::InsufficientPoints { .. } => {
                Self::conflict("INSUFFICIENT_POINTS", message)
            },
            TicketingError::OrderNotFinalizable { .. } => {
                Self::conflict("ORDER_NOT_FINALIZABLE", message)
            },
            TicketingError::OrderNotCancellable { .. } => {
                Self::conflict("ORDER_NOT_CANCELLABLE", message)
            },
            TicketingError::AlreadyUsed { .. } => Self::conflict("ALREADY_USED", message),
            TicketingError::Conflict(_) => Self::conflict("CONFLICT", message),
            TicketingError::UnpaidTicket(_) => Self::forbidden("UNPAID_TICKET", message),
            TicketingError::WrongEvent { .. } => Self::forbidden("WRONG_EVENT", message),
            TicketingError::OrderNotFound(id) => Self::not_found("Order", id),
            TicketingError::EventNotFound(id) => Self::not_found("Event", id),
            TicketingError::UserNotFound(id) => Self::not_found("User", id),
            TicketingError::UnitNotFound(id) => Self::not_found("Ticket", id),
            TicketingError::InvalidRequest(detail) => Self::validation(detail),
            TicketingError::TransientStoreFailure(_) => {
                Self::unavailable("The store is busy, retry the request")
                    .with_source(anyhow::Error::new(err))
            },
            TicketingError::Store(_) => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(err))
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}
