//! Bootstrap components for application initialization.
//!
//! # Modules
//!
//! - **`resources`**: Infrastructure setup (database pool, migrations, audit sink)
//! - **`components`**: Wiring the ticketing components over a store
//! - **`builder`**: Fluent builder producing a runnable [`Application`](crate::runtime::Application)
//!
//! # Example
//!
//! ```rust,ignore
//! ApplicationBuilder::new()
//!     .with_config(Config::from_env())
//!     .with_resources().await?
//!     .build().await?
//!     .run().await?;
//! ```

pub mod builder;
pub mod components;
pub mod resources;

pub use builder::ApplicationBuilder;
pub use components::Components;
pub use resources::ResourceManager;
