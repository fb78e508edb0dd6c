//! HTTP server module.
//!
//! A thin axum adapter over the checkout, check-in and catalog components:
//! - Application state
//! - Error mapping
//! - Authenticated-user extraction
//! - Health check
//! - Router configuration

pub mod error;
pub mod extract;
pub mod health;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use extract::AuthenticatedUser;
pub use health::health_check;
pub use routes::build_router;
pub use state::AppState;
