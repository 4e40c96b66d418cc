//! Error types for the payment relay.

/// Domain-level errors (request validation).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid amount: {0:?} is not a number")]
    InvalidAmount(String),

    #[error("Amount must be positive")]
    NonPositiveAmount,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Errors returned by the payment gateway port.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway request timed out")]
    Timeout,

    #[error("Gateway transport error: {0}")]
    Transport(String),

    #[error("Gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Payment not found")]
    NotFound,

    #[error("Unexpected gateway response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Timeout | GatewayError::Transport(_) => true,
            GatewayError::Rejected { status, .. } => *status == 429 || *status >= 500,
            GatewayError::NotFound | GatewayError::Decode(_) => false,
        }
    }
}

/// Errors raised by a fulfillment hook.
#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    #[error("Fulfillment is not implemented")]
    NotImplemented,

    #[error("Fulfillment failed: {0}")]
    Failed(String),
}

/// Failures while processing a gateway notification.
///
/// Never surfaced to the gateway: the webhook is acknowledged regardless.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid payment id in notification: {0}")]
    InvalidPaymentId(DomainError),

    #[error("Payment lookup failed: {0}")]
    Lookup(#[from] GatewayError),

    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {message}")]
    Upstream {
        message: String,
        details: Option<String>,
    },

    #[error("Upstream timeout: {0}")]
    GatewayTimeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
