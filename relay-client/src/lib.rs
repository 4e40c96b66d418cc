//! # Relay Client SDK
//!
//! A typed Rust client for the payment relay API.

use relay_types::{
    AmountInput, CreatePaymentRequest, HealthResponse, PaymentRecord, PixPaymentResponse,
};
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api {
        status: u16,
        message: String,
        details: Option<String>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Builds a creation request from the common fields.
pub fn payment_request(amount: &str, description: &str) -> CreatePaymentRequest {
    CreatePaymentRequest {
        amount: Some(AmountInput::Text(amount.to_string())),
        description: description.to_string(),
        user_email: None,
        external_reference: None,
    }
}

/// Payment relay API client.
pub struct RelayClient {
    base_url: String,
    forwarded_for: Option<String>,
    http: Client,
}

impl RelayClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            forwarded_for: None,
            http: Client::new(),
        }
    }

    /// Identifies the end client to the relay's rate limiter.
    pub fn with_forwarded_for(mut self, client_ip: impl Into<String>) -> Self {
        self.forwarded_for = Some(client_ip.into());
        self
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get("/health").await
    }

    /// Creates a payment and returns the full gateway record.
    pub async fn create_payment(
        &self,
        req: &CreatePaymentRequest,
    ) -> Result<PaymentRecord, ClientError> {
        self.post("/create-payment", req).await
    }

    /// Creates a payment and returns the QR code data.
    pub async fn create_pix_payment(
        &self,
        req: &CreatePaymentRequest,
    ) -> Result<PixPaymentResponse, ClientError> {
        self.post("/api/payments/pix", req).await
    }

    /// Gets a payment by gateway id.
    pub async fn payment_status(&self, id: &str) -> Result<PaymentRecord, ClientError> {
        self.get(&format!("/payment-status/{}", id)).await
    }

    /// Delivers a gateway-style notification to the relay's webhook.
    ///
    /// Useful for replaying a missed notification. The relay answers 200
    /// whatever happens, so success only means the delivery was accepted.
    pub async fn send_webhook(
        &self,
        topic: &str,
        payment_id: &str,
        signature: Option<(&str, &str)>,
    ) -> Result<(), ClientError> {
        let body = serde_json::json!({ "type": topic, "data": { "id": payment_id } });
        let mut req = self
            .http
            .post(format!("{}/webhook/mercadopago", self.base_url))
            .json(&body);
        if let Some((x_signature, request_id)) = signature {
            req = req
                .header("x-signature", x_signature)
                .header("x-request-id", request_id);
        }
        let resp = req.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(api_error(resp).await)
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let mut req = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(ip) = &self.forwarded_for {
            req = req.header("X-Forwarded-For", ip);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        if resp.status().is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(api_error(resp).await)
        }
    }
}

async fn api_error(resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let json = serde_json::from_str::<serde_json::Value>(&body).ok();
    let field = |name: &str| {
        json.as_ref()
            .and_then(|v| v.get(name))
            .and_then(|e| e.as_str())
            .map(String::from)
    };
    ClientError::Api {
        status,
        message: field("error").unwrap_or_else(|| body.clone()),
        details: field("details"),
    }
}
