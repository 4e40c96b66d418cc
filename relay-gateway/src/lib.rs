//! # Relay Gateway
//!
//! Outbound adapters for the PIX payment relay.
//! This crate provides the implementations of the `PaymentGateway` and
//! `FulfillmentHook` ports:
//!
//! - `mercadopago` - REST client for the MercadoPago payments API
//! - `memory` - in-memory gateway (feature `memory`), used by tests and demos
//! - `fulfillment` - not-implemented marker, HTTP forwarder, idempotency guard
//! - `retry` - bounded exponential backoff shared by the REST client
//! - `security` - HMAC signing and gateway webhook signature checks

pub mod fulfillment;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod mercadopago;
pub mod retry;
pub mod security;

pub use fulfillment::{HttpFulfillment, IdempotentFulfillment, NotImplementedFulfillment};
#[cfg(any(test, feature = "memory"))]
pub use memory::InMemoryGateway;
pub use mercadopago::{MercadoPagoConfig, MercadoPagoGateway};
pub use retry::RetryPolicy;
