//! API endpoints for the ticketing core.
//!
//! Handlers are thin: parse, call one component operation, shape the
//! response. All amounts in responses are in cents.
//!
//! - Users: registration and point history
//! - Checkout: pending checkout and immediate booking
//! - Orders: order details and cancellation
//! - Payments: the gateway's confirmation webhook
//! - Tickets: door check-in
//! - Events: catalog boundary and inventory

pub mod checkout;
pub mod events;
pub mod orders;
pub mod payments;
pub mod tickets;
pub mod users;

pub use checkout::{book_immediate, initiate_checkout};
pub use events::{create_event, event_inventory, get_event};
pub use orders::{cancel_order, get_order};
pub use payments::payment_webhook;
pub use tickets::{bulk_check_in, check_in};
pub use users::{point_history, register_user};
