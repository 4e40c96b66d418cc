//! Payment gateway port.
//!
//! The relay never owns payment records; it only creates them on the
//! gateway and reads them back by id. Adapters may be a REST client, an
//! SDK wrapper or an in-memory fake.

use crate::domain::{GatewayPaymentRequest, PaymentId, PaymentRecord};
use crate::error::GatewayError;

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Creates a payment on the gateway.
    ///
    /// `idempotency_key` must be forwarded unchanged on every retry of the
    /// same logical creation.
    async fn create_payment(
        &self,
        req: &GatewayPaymentRequest,
        idempotency_key: &str,
    ) -> Result<PaymentRecord, GatewayError>;

    /// Fetches the authoritative payment record by id.
    async fn get_payment(&self, id: &PaymentId) -> Result<PaymentRecord, GatewayError>;
}

/// Shares one gateway between the service and other owners.
#[async_trait::async_trait]
impl<G: PaymentGateway> PaymentGateway for std::sync::Arc<G> {
    async fn create_payment(
        &self,
        req: &GatewayPaymentRequest,
        idempotency_key: &str,
    ) -> Result<PaymentRecord, GatewayError> {
        (**self).create_payment(req, idempotency_key).await
    }

    async fn get_payment(&self, id: &PaymentId) -> Result<PaymentRecord, GatewayError> {
        (**self).get_payment(id).await
    }
}
