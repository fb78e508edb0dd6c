//! Runtime components.
//!
//! - **`lifecycle`**: Application lifecycle management and graceful shutdown

pub mod lifecycle;

pub use lifecycle::Application;
