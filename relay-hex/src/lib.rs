//! # Relay Hex
//!
//! Application service layer and HTTP adapter for the PIX payment relay.
//!
//! ## Architecture
//!
//! - `service/` - Application service (creation, lookup, webhook handling)
//! - `inbound/` - HTTP adapter (Axum server)
//! - `openapi/` - OpenAPI document served under `/swagger-ui`
//!
//! The service is generic over `G: PaymentGateway` and `F: FulfillmentHook`,
//! allowing different adapters to be injected.

pub mod inbound;
pub mod openapi;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::{RelayConfig, RelayService};
