//! Payment collaborator stub.
//!
//! The core only needs an opaque reference and a URL to hand back to the
//! customer when a checkout opens. Confirmation arrives later through the
//! payment webhook, which calls `Checkout::complete_payment`.
//!
//! Issuing a reference is pure and runs inside the checkout transaction, so
//! it must not block or do I/O.

use boxoffice_core::money::Money;
use boxoffice_core::types::OrderId;
use serde::Serialize;
use std::sync::Arc;

/// What the customer is sent to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentReference {
    /// Opaque gateway reference stored on the order
    pub reference: String,
    /// Where the customer completes payment
    pub url: String,
}

/// Payment gateway trait
///
/// Abstraction over the hosted payment page of a real processor.
pub trait PaymentGateway: Send + Sync {
    /// Produce a payment reference for an order awaiting `amount`.
    fn issue_reference(&self, order_id: OrderId, amount: Money) -> PaymentReference;
}

/// Mock payment gateway pointing at the built-in mock billing page.
#[derive(Clone, Debug)]
pub struct MockPaymentGateway {
    base_url: String,
}

impl MockPaymentGateway {
    /// Creates a mock gateway whose URLs live under `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(base_url: impl Into<String>) -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new(base_url))
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn issue_reference(&self, order_id: OrderId, amount: Money) -> PaymentReference {
        let reference = format!("mock_bill_{}", order_id.as_uuid().simple());
        tracing::debug!(
            order_id = %order_id,
            amount = %amount,
            reference = %reference,
            "Issued mock payment reference"
        );
        PaymentReference {
            url: format!("{}/mock-billplz/{order_id}", self.base_url),
            reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_points_at_mock_billing_page() {
        let gateway = MockPaymentGateway::new("http://localhost:8080/");
        let order_id = OrderId::new();

        let payment = gateway.issue_reference(order_id, Money::from_cents(4900));

        assert_eq!(
            payment.url,
            format!("http://localhost:8080/mock-billplz/{order_id}")
        );
        assert!(payment.reference.starts_with("mock_bill_"));
    }

    #[test]
    fn references_are_stable_per_order() {
        let gateway = MockPaymentGateway::new("http://pay.test");
        let order_id = OrderId::new();
        assert_eq!(
            gateway.issue_reference(order_id, Money::ZERO),
            gateway.issue_reference(order_id, Money::ZERO)
        );
    }
}
