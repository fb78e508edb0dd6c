//! Business metrics for the ticketing core.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `ticketing_orders_total{status}` - Orders by transition (opened, paid, booked, expired, cancelled)
//! - `ticketing_checkout_failures_total{reason}` - Rejected checkouts by error kind
//! - `ticketing_tickets_sold_total` - Units sold
//! - `ticketing_tickets_released_total` - Units returned to the pool
//! - `ticketing_payment_revenue_cents_total` - Revenue from finalized orders in cents
//! - `ticketing_points_total{kind}` - Points journaled (earned, redeemed)
//! - `ticketing_checkins_total{result}` - Door scans by outcome
//! - `ticketing_sweeper_failures_total` - Orders the sweeper failed to expire
//! - `ticketing_events_created_total` - Events published
//!
//! ## Gauges
//! - `ticketing_tickets_available{event_id}` - Available units at last inventory read
//!
//! ## Histograms
//! - `ticketing_sweep_duration_seconds` - Time taken by one sweeper pass

use boxoffice_core::error::TicketingError;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder with an HTTP scrape listener on `addr`
/// and register the metric descriptions.
///
/// # Errors
///
/// Returns error if a recorder is already installed or the listener
/// cannot be set up.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install()?;
    register_business_metrics();
    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    // Order metrics
    describe_counter!(
        "ticketing_orders_total",
        "Total number of order transitions by status (opened, paid, booked, expired, cancelled)"
    );
    describe_counter!(
        "ticketing_checkout_failures_total",
        "Total number of rejected checkouts by reason"
    );
    describe_counter!(
        "ticketing_payment_revenue_cents_total",
        "Total revenue from finalized orders in cents"
    );

    // Inventory metrics
    describe_counter!("ticketing_tickets_sold_total", "Total number of tickets sold");
    describe_counter!(
        "ticketing_tickets_released_total",
        "Total number of reserved tickets returned to the pool"
    );
    describe_gauge!(
        "ticketing_tickets_available",
        "Available tickets per event at the last inventory read"
    );

    // Loyalty metrics
    describe_counter!("ticketing_points_total", "Total points journaled by kind");

    // Door metrics
    describe_counter!("ticketing_checkins_total", "Total door scans by result");

    // Sweeper metrics
    describe_counter!(
        "ticketing_sweeper_failures_total",
        "Total number of stale orders the sweeper failed to expire"
    );
    describe_histogram!(
        "ticketing_sweep_duration_seconds",
        "Time taken by one sweeper pass"
    );

    // Catalog metrics
    describe_counter!("ticketing_events_created_total", "Total number of events created");

    tracing::info!("Business metrics registered");
}

/// Short, bounded label for an error, used as a metric label.
#[must_use]
pub const fn error_label(err: &TicketingError) -> &'static str {
    match err {
        TicketingError::InsufficientStock { .. } => "insufficient_stock",
        TicketingError::InsufficientPoints { .. } => "insufficient_points",
        TicketingError::OrderNotFinalizable { .. } => "not_finalizable",
        TicketingError::OrderNotCancellable { .. } => "not_cancellable",
        TicketingError::OrderNotFound(_) => "order_not_found",
        TicketingError::EventNotFound(_) => "event_not_found",
        TicketingError::UserNotFound(_) => "user_not_found",
        TicketingError::UnitNotFound(_) => "ticket_not_found",
        TicketingError::UnpaidTicket(_) => "unpaid",
        TicketingError::WrongEvent { .. } => "wrong_event",
        TicketingError::AlreadyUsed { .. } => "already_used",
        TicketingError::InvalidRequest(_) => "invalid_request",
        TicketingError::Conflict(_) => "conflict",
        TicketingError::TransientStoreFailure(_) => "transient",
        TicketingError::Store(_) => "store",
    }
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a pending order opened.
///
/// # Arguments
///
/// * `units` - Number of units held by the order
pub fn record_order_opened(units: usize) {
    metrics::counter!("ticketing_orders_total", "status" => "opened").increment(1);
    tracing::debug!(units, "Recorded order_opened metric");
}

/// Record a rejected checkout.
pub fn record_checkout_failed(err: &TicketingError) {
    let reason = error_label(err);
    metrics::counter!("ticketing_checkout_failures_total", "reason" => reason).increment(1);
    tracing::debug!(reason, "Recorded checkout_failed metric");
}

/// Record an order moving to paid, through the webhook or an immediate booking.
///
/// # Arguments
///
/// * `status` - `"paid"` or `"booked"`
/// * `units_sold` - Units marked sold
/// * `revenue_cents` - Amount charged
pub fn record_order_paid(status: &'static str, units_sold: u64, revenue_cents: u64) {
    metrics::counter!("ticketing_orders_total", "status" => status).increment(1);
    metrics::counter!("ticketing_tickets_sold_total").increment(units_sold);
    metrics::counter!("ticketing_payment_revenue_cents_total").increment(revenue_cents);
    tracing::debug!(status, units_sold, revenue_cents, "Recorded order_paid metric");
}

/// Record a pending order leaving through expiry or cancellation.
///
/// # Arguments
///
/// * `status` - `"expired"` or `"cancelled"`
/// * `released` - Units returned to the pool
pub fn record_order_released(status: &'static str, released: u64) {
    metrics::counter!("ticketing_orders_total", "status" => status).increment(1);
    metrics::counter!("ticketing_tickets_released_total").increment(released);
    tracing::debug!(status, released, "Recorded order_released metric");
}

/// Record points journaled.
pub fn record_points(kind: &'static str, points: i64) {
    if points > 0 {
        metrics::counter!("ticketing_points_total", "kind" => kind)
            .increment(points.unsigned_abs());
    }
}

/// Record a door scan.
///
/// # Arguments
///
/// * `result` - `"admitted"` or an [`error_label`]
pub fn record_check_in(result: &'static str) {
    metrics::counter!("ticketing_checkins_total", "result" => result).increment(1);
    tracing::debug!(result, "Recorded check_in metric");
}

/// Record one sweeper pass.
pub fn record_sweep(failed: u64, duration_secs: f64) {
    metrics::counter!("ticketing_sweeper_failures_total").increment(failed);
    metrics::histogram!("ticketing_sweep_duration_seconds").record(duration_secs);
    tracing::debug!(failed, duration_secs, "Recorded sweep metric");
}

/// Record an event created.
pub fn record_event_created() {
    metrics::counter!("ticketing_events_created_total").increment(1);
    tracing::debug!("Recorded event_created metric");
}

/// Update available tickets gauge for an event.
///
/// # Arguments
///
/// * `event_id` - Event ID as string
/// * `available` - Current number of available tickets
#[allow(clippy::cast_precision_loss)]
pub fn update_tickets_available(event_id: &str, available: u64) {
    metrics::gauge!("ticketing_tickets_available", "event_id" => event_id.to_owned())
        .set(available as f64);
    tracing::debug!(event_id, available, "Updated tickets_available metric");
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxoffice_core::types::UnitId;

    #[test]
    fn labels_are_stable() {
        assert_eq!(
            error_label(&TicketingError::UnpaidTicket(UnitId::new(1))),
            "unpaid"
        );
        assert_eq!(
            error_label(&TicketingError::TransientStoreFailure("lock".into())),
            "transient"
        );
    }

    #[test]
    fn recording_without_a_recorder_is_a_no_op() {
        record_order_opened(2);
        record_points("earned", 490);
        record_check_in("admitted");
        update_tickets_available("evt", 10);
    }
}
