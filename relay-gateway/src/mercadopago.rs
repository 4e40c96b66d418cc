//! MercadoPago REST adapter for the `PaymentGateway` port.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use relay_types::{GatewayError, GatewayPaymentRequest, PaymentGateway, PaymentId, PaymentRecord};
use reqwest::StatusCode;
use tracing::instrument;

use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.mercadopago.com";

/// Connection settings for the MercadoPago API.
#[derive(Clone)]
pub struct MercadoPagoConfig {
    pub base_url: String,
    pub access_token: String,
    /// Per-call timeout. Applied to every attempt, not to the retry loop.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl MercadoPagoConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: access_token.into(),
            timeout: Duration::from_millis(5000),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for MercadoPagoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MercadoPagoConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Payment gateway backed by `api.mercadopago.com`.
#[derive(Debug)]
pub struct MercadoPagoGateway {
    config: MercadoPagoConfig,
    client: reqwest::Client,
}

impl MercadoPagoGateway {
    pub fn new(mut config: MercadoPagoConfig) -> Result<Self, GatewayError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<PaymentRecord, GatewayError> {
        let resp = request
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        handle_response(resp).await
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    #[instrument(skip(self, req), fields(amount = %req.transaction_amount))]
    async fn create_payment(
        &self,
        req: &GatewayPaymentRequest,
        idempotency_key: &str,
    ) -> Result<PaymentRecord, GatewayError> {
        let url = self.url("/v1/payments");
        let this = self;
        self.config
            .retry
            .run("create_payment", move |_| {
                let request = this
                    .client
                    .post(&url)
                    .header("X-Idempotency-Key", idempotency_key)
                    .json(req);
                this.send(request)
            })
            .await
    }

    #[instrument(skip(self), fields(payment_id = %id))]
    async fn get_payment(&self, id: &PaymentId) -> Result<PaymentRecord, GatewayError> {
        let url = self.url(&format!("/v1/payments/{}", id));
        let this = self;
        self.config
            .retry
            .run("get_payment", move |_| this.send(this.client.get(&url)))
            .await
    }
}

fn map_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        // Strip the URL so nothing request-specific ends up in error text.
        GatewayError::Transport(err.without_url().to_string())
    }
}

async fn handle_response(resp: reqwest::Response) -> Result<PaymentRecord, GatewayError> {
    let status = resp.status();
    let body = resp.text().await.map_err(map_transport_error)?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()));
    }

    if status == StatusCode::NOT_FOUND {
        return Err(GatewayError::NotFound);
    }

    Err(GatewayError::Rejected {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Pulls the gateway's `message` field out of an error body, falling back to
/// a truncated copy of the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
