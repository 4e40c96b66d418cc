//! Domain models for the payment relay.

pub mod amount;
pub mod payment;
pub mod webhook;

pub use amount::Amount;
pub use payment::{
    GatewayPayer, GatewayPaymentRequest, PIX_PAYMENT_METHOD, Payer, PayerDefaults, PaymentId,
    PaymentRecord, PaymentRequest, PaymentStatus, PointOfInteraction, TransactionData,
};
pub use webhook::{PAYMENT_TOPIC, WebhookNotification, WebhookOutcome};
