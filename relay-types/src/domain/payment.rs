//! Payment requests and the gateway-owned payment record.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::amount::Amount;
use crate::error::DomainError;

/// Payment method identifier for PIX instant transfers.
pub const PIX_PAYMENT_METHOD: &str = "pix";

// ─────────────────────────────────────────────────────────────────────────────
// Payment ID
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque gateway-issued payment identifier.
///
/// The gateway emits numeric ids; they are normalised to strings so the
/// relay never depends on their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parses an id from untrusted input (path segment, webhook payload).
    ///
    /// Only ASCII alphanumerics, `-` and `_` are accepted so the id can be
    /// placed into a gateway URL path verbatim.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::MissingField("id"));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::ValidationError(format!(
                "Invalid payment id: {trimmed}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PaymentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PaymentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for PaymentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl serde::de::Visitor<'_> for IdVisitor {
            type Value = PaymentId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a payment id as string or integer")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<PaymentId, E> {
                Ok(PaymentId::new(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<PaymentId, E> {
                Ok(PaymentId::new(v.to_string()))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<PaymentId, E> {
                Ok(PaymentId::new(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment Status
// ─────────────────────────────────────────────────────────────────────────────

/// Payment status as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Authorized,
    InProcess,
    InMediation,
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Only approved payments trigger fulfillment.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl AsRef<str> for PaymentStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Authorized => "authorized",
            Self::InProcess => "in_process",
            Self::InMediation => "in_mediation",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::ChargedBack => "charged_back",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment Record (owned by the gateway)
// ─────────────────────────────────────────────────────────────────────────────

/// Payer details on a gateway record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// PIX presentment data returned after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointOfInteraction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_data: Option<TransactionData>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The gateway's authoritative payment record.
///
/// The relay reads a handful of typed fields; everything else is kept in
/// `extra` so the full object round-trips back to callers unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<Payer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_of_interaction: Option<PointOfInteraction>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PaymentRecord {
    /// Creates a bare record with the given id and status.
    pub fn new(id: impl Into<PaymentId>, status: PaymentStatus) -> Self {
        Self {
            id: id.into(),
            status,
            transaction_amount: None,
            payer: None,
            external_reference: None,
            point_of_interaction: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn payer_email(&self) -> Option<&str> {
        self.payer.as_ref().and_then(|p| p.email.as_deref())
    }

    pub fn transaction_data(&self) -> Option<&TransactionData> {
        self.point_of_interaction
            .as_ref()
            .and_then(|poi| poi.transaction_data.as_ref())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outgoing requests
// ─────────────────────────────────────────────────────────────────────────────

/// Fallback payer identity used when the caller supplies no email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayerDefaults {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Default for PayerDefaults {
    fn default() -> Self {
        Self {
            email: "usuario@soundguard.com".to_string(),
            first_name: "Usuario".to_string(),
            last_name: "SoundGuard".to_string(),
        }
    }
}

/// A validated payment-creation request. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub amount: Amount,
    pub description: String,
    pub payer_email: Option<String>,
    pub external_reference: Option<String>,
}

impl PaymentRequest {
    /// Builds the gateway body for a PIX payment.
    pub fn to_gateway_request(
        &self,
        defaults: &PayerDefaults,
        notification_url: Option<&str>,
    ) -> GatewayPaymentRequest {
        GatewayPaymentRequest {
            transaction_amount: self.amount.value(),
            description: self.description.clone(),
            payment_method_id: PIX_PAYMENT_METHOD.to_string(),
            payer: GatewayPayer {
                email: self
                    .payer_email
                    .clone()
                    .unwrap_or_else(|| defaults.email.clone()),
                first_name: defaults.first_name.clone(),
                last_name: defaults.last_name.clone(),
            },
            external_reference: self.external_reference.clone(),
            notification_url: notification_url.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPayer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Body of the gateway's create-payment call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPaymentRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub transaction_amount: Decimal,
    pub description: String,
    pub payment_method_id: String,
    pub payer: GatewayPayer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_id_parse() {
        assert_eq!(PaymentId::parse(" 123 ").unwrap().as_str(), "123");
        assert!(matches!(
            PaymentId::parse(""),
            Err(DomainError::MissingField("id"))
        ));
        assert!(matches!(
            PaymentId::parse("../v1/users"),
            Err(DomainError::ValidationError(_))
        ));
    }

    #[test]
    fn test_record_from_gateway_json() {
        let json = serde_json::json!({
            "id": 1234567890u64,
            "status": "approved",
            "transaction_amount": 49.9,
            "payer": { "email": "buyer@example.com", "id": "99" },
            "external_reference": "order-42",
            "point_of_interaction": {
                "type": "PIX",
                "transaction_data": {
                    "qr_code": "000201...",
                    "qr_code_base64": "iVBORw0KGgo="
                }
            },
            "date_created": "2024-01-01T00:00:00.000-03:00"
        });

        let record: PaymentRecord = serde_json::from_value(json).unwrap();

        assert_eq!(record.id.as_str(), "1234567890");
        assert!(record.status.is_approved());
        assert_eq!(record.transaction_amount, Some(Decimal::new(499, 1)));
        assert_eq!(record.payer_email(), Some("buyer@example.com"));
        assert_eq!(record.external_reference.as_deref(), Some("order-42"));
        assert_eq!(
            record.transaction_data().and_then(|t| t.qr_code.as_deref()),
            Some("000201...")
        );
        assert!(record.extra.contains_key("date_created"));
    }

    #[test]
    fn test_record_preserves_unknown_fields() {
        let json = serde_json::json!({
            "id": "abc",
            "status": "pending",
            "currency_id": "BRL",
        });

        let record: PaymentRecord = serde_json::from_value(json).unwrap();
        let back = serde_json::to_value(&record).unwrap();

        assert_eq!(back["currency_id"], "BRL");
        assert_eq!(back["id"], "abc");
        assert_eq!(back["status"], "pending");
    }

    #[test]
    fn test_unknown_status_is_preserved_as_unknown() {
        let record: PaymentRecord =
            serde_json::from_value(serde_json::json!({ "id": "1", "status": "weird" })).unwrap();
        assert_eq!(record.status, PaymentStatus::Unknown);
        assert!(!record.status.is_approved());
    }

    #[test]
    fn test_gateway_request_uses_defaults() {
        let req = PaymentRequest {
            amount: "10.50".parse().unwrap(),
            description: "Plano Premium".to_string(),
            payer_email: None,
            external_reference: Some("user-7".to_string()),
        };

        let body = req.to_gateway_request(&PayerDefaults::default(), None);

        assert_eq!(body.payment_method_id, "pix");
        assert_eq!(body.transaction_amount, Decimal::new(1050, 2));
        assert_eq!(body.payer.email, "usuario@soundguard.com");
        assert_eq!(body.payer.first_name, "Usuario");
        assert_eq!(body.payer.last_name, "SoundGuard");

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["transaction_amount"], 10.5);
        assert_eq!(json["external_reference"], "user-7");
        assert!(json.get("notification_url").is_none());
    }
}
