//! Fulfillment hook port.

use crate::domain::PaymentRecord;
use crate::error::FulfillmentError;

/// Business logic run once a payment is confirmed as approved.
///
/// Implementations locate the order by `external_reference` or payer email,
/// mark it paid, grant the entitlement and notify the user. They are
/// expected to be idempotent per payment id: the gateway delivers the same
/// notification more than once.
#[async_trait::async_trait]
pub trait FulfillmentHook: Send + Sync + 'static {
    async fn fulfill(&self, payment: &PaymentRecord) -> Result<(), FulfillmentError>;
}
