//! # Relay Types
//!
//! Domain types and port traits for the PIX payment relay.
//! This crate has ZERO external IO dependencies - only data structures,
//! validation rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Amount, PaymentRecord, WebhookNotification)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain, gateway and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Amount, GatewayPayer, GatewayPaymentRequest, PIX_PAYMENT_METHOD, Payer, PayerDefaults,
    PaymentId, PaymentRecord, PaymentRequest, PaymentStatus, PointOfInteraction, TransactionData,
    WebhookNotification, WebhookOutcome,
};
pub use dto::*;
pub use error::{AppError, DomainError, FulfillmentError, GatewayError, WebhookError};
pub use ports::{FulfillmentHook, PaymentGateway};
