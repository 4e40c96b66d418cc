//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Amount, PaymentRecord, PaymentRequest};
use crate::error::DomainError;

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "Payment relay online")]
    pub status: String,
    /// Current server time (RFC 3339)
    pub timestamp: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment creation
// ─────────────────────────────────────────────────────────────────────────────

/// Amount as sent by callers: either a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(serde_json::Number),
    Text(String),
    Other(serde_json::Value),
}

impl AmountInput {
    pub fn parse(&self) -> Result<Amount, DomainError> {
        match self {
            AmountInput::Number(n) => n.to_string().parse(),
            AmountInput::Text(s) => s.parse(),
            AmountInput::Other(v) => Err(DomainError::InvalidAmount(v.to_string())),
        }
    }
}

/// Request to create a PIX payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    /// Amount in major units, as a number or numeric string
    #[schema(value_type = String, example = "49.90")]
    #[serde(default)]
    pub amount: Option<AmountInput>,
    /// What the payer is paying for
    #[schema(example = "SoundGuard Premium")]
    #[serde(default)]
    pub description: String,
    /// Payer email; a configured default is used when absent
    #[schema(example = "buyer@example.com")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    /// Correlation id echoed back by the gateway on the payment record
    #[schema(example = "order-42")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
}

impl TryFrom<CreatePaymentRequest> for PaymentRequest {
    type Error = DomainError;

    fn try_from(req: CreatePaymentRequest) -> Result<Self, Self::Error> {
        let amount = req
            .amount
            .as_ref()
            .ok_or(DomainError::MissingField("amount"))?
            .parse()?;

        let description = req.description.trim();
        if description.is_empty() {
            return Err(DomainError::MissingField("description"));
        }

        let payer_email = non_blank(req.user_email);
        if let Some(email) = &payer_email {
            if !email.contains('@') {
                return Err(DomainError::ValidationError(format!(
                    "Invalid payer email: {email}"
                )));
            }
        }

        Ok(PaymentRequest {
            amount,
            description: description.to_string(),
            payer_email,
            external_reference: non_blank(req.external_reference),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Normalized PIX presentment data returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PixPaymentResponse {
    /// Gateway payment id
    #[schema(example = "1234567890")]
    pub id: String,
    #[schema(example = "pending")]
    pub status: String,
    /// PIX copy-and-paste code
    pub qr_code: Option<String>,
    /// PNG of the QR code, base64 encoded
    pub qr_code_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_url: Option<String>,
}

impl From<&PaymentRecord> for PixPaymentResponse {
    fn from(record: &PaymentRecord) -> Self {
        let data = record.transaction_data();
        Self {
            id: record.id.to_string(),
            status: record.status.to_string(),
            qr_code: data.and_then(|d| d.qr_code.clone()),
            qr_code_base64: data.and_then(|d| d.qr_code_base64.clone()),
            ticket_url: data.and_then(|d| d.ticket_url.clone()),
        }
    }
}
