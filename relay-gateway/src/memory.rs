//! In-memory payment gateway for development and tests.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use relay_types::{
    GatewayError, GatewayPaymentRequest, Payer, PaymentGateway, PaymentId, PaymentRecord,
    PaymentStatus, PointOfInteraction, TransactionData,
};

/// Base64 of a 1x1 PNG, standing in for a rendered QR code.
const PLACEHOLDER_QR_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// A gateway that keeps payments in a concurrent map.
///
/// Creation honours idempotency keys the same way the real gateway does:
/// replaying a key returns the payment created by the first call.
pub struct InMemoryGateway {
    payments: DashMap<PaymentId, PaymentRecord>,
    idempotency: DashMap<String, PaymentId>,
    next_id: AtomicU64,
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            payments: DashMap::new(),
            idempotency: DashMap::new(),
            next_id: AtomicU64::new(1_000_000_001),
        }
    }

    /// Simulates the payer completing (or failing) the PIX transfer.
    pub fn set_status(&self, id: &PaymentId, status: PaymentStatus) -> Result<(), GatewayError> {
        let mut record = self.payments.get_mut(id).ok_or(GatewayError::NotFound)?;
        record.status = status;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    fn build_record(&self, req: &GatewayPaymentRequest) -> PaymentRecord {
        let id = PaymentId::new(self.next_id.fetch_add(1, Ordering::SeqCst).to_string());

        let mut record = PaymentRecord::new(id.clone(), PaymentStatus::Pending);
        record.transaction_amount = Some(req.transaction_amount);
        record.external_reference = req.external_reference.clone();
        record.payer = Some(Payer {
            email: Some(req.payer.email.clone()),
            extra: serde_json::Map::new(),
        });
        record.point_of_interaction = Some(PointOfInteraction {
            transaction_data: Some(TransactionData {
                qr_code: Some(format!("00020126580014br.gov.bcb.pix0136{id}")),
                qr_code_base64: Some(PLACEHOLDER_QR_PNG.to_string()),
                ticket_url: None,
                extra: serde_json::Map::new(),
            }),
            extra: serde_json::Map::new(),
        });
        record.extra.insert(
            "description".to_string(),
            serde_json::Value::String(req.description.clone()),
        );
        record.extra.insert(
            "payment_method_id".to_string(),
            serde_json::Value::String(req.payment_method_id.clone()),
        );
        record.extra.insert(
            "date_created".to_string(),
            serde_json::Value::String(Utc::now().to_rfc3339()),
        );
        record
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_payment(
        &self,
        req: &GatewayPaymentRequest,
        idempotency_key: &str,
    ) -> Result<PaymentRecord, GatewayError> {
        let id = self
            .idempotency
            .entry(idempotency_key.to_string())
            .or_insert_with(|| {
                let record = self.build_record(req);
                let id = record.id.clone();
                self.payments.insert(id.clone(), record);
                id
            })
            .clone();

        self.payments
            .get(&id)
            .map(|r| r.clone())
            .ok_or(GatewayError::NotFound)
    }

    async fn get_payment(&self, id: &PaymentId) -> Result<PaymentRecord, GatewayError> {
        self.payments
            .get(id)
            .map(|r| r.clone())
            .ok_or(GatewayError::NotFound)
    }
}
