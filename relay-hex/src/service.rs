//! Relay Application Service
//!
//! Orchestrates payment creation, status lookup and webhook handling
//! through the gateway and fulfillment ports.
//! Contains NO infrastructure logic - pure orchestration.

use std::fmt;

use relay_gateway::security::verify_mercadopago_signature;
use relay_types::{
    AppError, CreatePaymentRequest, FulfillmentHook, GatewayError, PayerDefaults, PaymentGateway,
    PaymentId, PaymentRecord, PaymentRequest, PixPaymentResponse, WebhookError,
    WebhookNotification, WebhookOutcome,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Static settings the service reads on every request.
///
/// Built once at startup and never mutated.
#[derive(Clone, Default)]
pub struct RelayConfig {
    pub payer_defaults: PayerDefaults,
    /// Sent to the gateway as the per-payment webhook target.
    pub notification_url: Option<String>,
    /// When set, webhook deliveries must carry a valid `x-signature`.
    pub webhook_secret: Option<String>,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("payer_defaults", &self.payer_defaults)
            .field("notification_url", &self.notification_url)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Application service for the payment relay.
///
/// Generic over the gateway and the fulfillment hook - both adapters are
/// injected at compile time, which lets tests swap in fakes.
pub struct RelayService<G: PaymentGateway, F: FulfillmentHook> {
    gateway: G,
    fulfillment: F,
    config: RelayConfig,
}

impl<G: PaymentGateway, F: FulfillmentHook> RelayService<G, F> {
    /// Creates a new relay service with default settings.
    pub fn new(gateway: G, fulfillment: F) -> Self {
        Self::with_config(gateway, fulfillment, RelayConfig::default())
    }

    pub fn with_config(gateway: G, fulfillment: F, config: RelayConfig) -> Self {
        Self {
            gateway,
            fulfillment,
            config,
        }
    }

    /// Returns a reference to the underlying gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn fulfillment(&self) -> &F {
        &self.fulfillment
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment Creation
    // ─────────────────────────────────────────────────────────────────────────────

    /// Validates the request and creates a PIX payment on the gateway.
    ///
    /// Validation failures never reach the gateway.
    pub async fn create_payment(
        &self,
        req: CreatePaymentRequest,
    ) -> Result<PaymentRecord, AppError> {
        let request = PaymentRequest::try_from(req)?;
        let body = request.to_gateway_request(
            &self.config.payer_defaults,
            self.config.notification_url.as_deref(),
        );
        let idempotency_key = Uuid::new_v4().to_string();

        let record = self
            .gateway
            .create_payment(&body, &idempotency_key)
            .await
            .map_err(|e| {
                error!(error = %e, %idempotency_key, "gateway payment creation failed");
                match e {
                    GatewayError::Timeout => {
                        AppError::GatewayTimeout("Payment gateway timed out".into())
                    }
                    other => AppError::Upstream {
                        message: "Failed to create payment".into(),
                        details: Some(other.to_string()),
                    },
                }
            })?;

        info!(payment_id = %record.id, status = %record.status, "payment created");
        Ok(record)
    }

    /// Same as `create_payment`, reduced to the PIX presentment fields.
    pub async fn create_pix_payment(
        &self,
        req: CreatePaymentRequest,
    ) -> Result<PixPaymentResponse, AppError> {
        let record = self.create_payment(req).await?;
        Ok(PixPaymentResponse::from(&record))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Status Lookup
    // ─────────────────────────────────────────────────────────────────────────────

    /// Fetches the full gateway record. Failure details stay in the logs.
    pub async fn get_payment(&self, id: &str) -> Result<PaymentRecord, AppError> {
        let id = PaymentId::parse(id)?;

        self.gateway.get_payment(&id).await.map_err(|e| {
            error!(payment_id = %id, error = %e, "payment status lookup failed");
            match e {
                GatewayError::NotFound => AppError::NotFound("Payment not found".into()),
                GatewayError::Timeout => {
                    AppError::GatewayTimeout("Payment gateway timed out".into())
                }
                _ => AppError::Upstream {
                    message: "Internal error".into(),
                    details: None,
                },
            }
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Webhooks
    // ─────────────────────────────────────────────────────────────────────────────

    /// Checks the gateway signature when a webhook secret is configured.
    pub fn verify_webhook_signature(
        &self,
        x_signature: Option<&str>,
        request_id: Option<&str>,
        data_id: Option<&str>,
    ) -> bool {
        let Some(secret) = self.config.webhook_secret.as_deref() else {
            return true;
        };
        match x_signature {
            Some(header) => verify_mercadopago_signature(header, request_id, data_id, secret),
            None => false,
        }
    }

    /// Fetches the notified payment and fulfills it when approved.
    ///
    /// Exactly one gateway lookup is made per notification that names a
    /// payment; the fulfillment hook runs only for `approved`.
    #[instrument(
        skip(self),
        fields(topic = ?notification.topic, payment_id = ?notification.payment_id)
    )]
    pub async fn handle_notification(
        &self,
        notification: &WebhookNotification,
    ) -> Result<WebhookOutcome, WebhookError> {
        let Some(raw_id) = notification.payment_lookup() else {
            info!("notification ignored");
            return Ok(WebhookOutcome::Ignored);
        };

        let id = PaymentId::parse(raw_id.as_str()).map_err(WebhookError::InvalidPaymentId)?;
        let payment = self.gateway.get_payment(&id).await?;

        info!(
            status = %payment.status,
            amount = ?payment.transaction_amount,
            external_reference = ?payment.external_reference,
            "payment details fetched"
        );

        if !payment.status.is_approved() {
            return Ok(WebhookOutcome::NotApproved(payment.status));
        }

        info!("payment approved, running fulfillment");
        if let Err(e) = self.fulfillment.fulfill(&payment).await {
            warn!(error = %e, "fulfillment did not complete");
            return Err(e.into());
        }

        Ok(WebhookOutcome::Fulfilled(payment.id))
    }
}
