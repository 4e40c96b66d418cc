//! OpenAPI document and Swagger UI schema.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use relay_types::dto::{CreatePaymentRequest, HealthResponse, PixPaymentResponse};
use utoipa::OpenApi;

// Dummy functions to generate path documentation.

/// Health check endpoint (also served at `/`)
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Relay is online", body = HealthResponse)
    )
)]
async fn health() {}

/// Create a PIX payment and return the full gateway record
#[utoipa::path(
    post,
    path = "/create-payment",
    tag = "payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Payment created", body = inline(serde_json::Value)),
        (status = 400, description = "Invalid amount, description or email"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 502, description = "Gateway rejected or failed the request"),
        (status = 504, description = "Gateway timed out")
    )
)]
async fn create_payment() {}

/// Create a PIX payment and return the QR code data
#[utoipa::path(
    post,
    path = "/api/payments/pix",
    tag = "payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Payment created", body = PixPaymentResponse),
        (status = 400, description = "Invalid amount, description or email"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 502, description = "Gateway rejected or failed the request")
    )
)]
async fn create_pix_payment() {}

/// Fetch a payment from the gateway (also served at `/api/payments/{id}`)
#[utoipa::path(
    get,
    path = "/payment-status/{id}",
    tag = "payments",
    params(
        ("id" = String, Path, description = "Gateway payment id")
    ),
    responses(
        (status = 200, description = "Gateway payment record", body = inline(serde_json::Value)),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Payment not found"),
        (status = 502, description = "Gateway failure")
    )
)]
async fn payment_status() {}

/// Receive a MercadoPago notification
#[utoipa::path(
    post,
    path = "/webhook/mercadopago",
    tag = "webhooks",
    params(
        ("topic" = Option<String>, Query, description = "Notification topic (legacy IPN)"),
        ("type" = Option<String>, Query, description = "Notification type"),
        ("id" = Option<String>, Query, description = "Resource id (legacy IPN)"),
        ("data.id" = Option<String>, Query, description = "Resource id")
    ),
    request_body = inline(serde_json::Value),
    responses(
        (status = 200, description = "Always acknowledged", body = String, example = json!("OK"))
    )
)]
async fn mercadopago_webhook() {}

/// OpenAPI documentation for the payment relay.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "PIX Payment Relay API",
        version = "1.0.0",
        description = "PIX payments on MercadoPago with webhook-driven fulfillment.",
        license(name = "MIT"),
    ),
    paths(
        health,
        create_payment,
        create_pix_payment,
        payment_status,
        mercadopago_webhook,
    ),
    components(schemas(CreatePaymentRequest, PixPaymentResponse, HealthResponse)),
    tags(
        (name = "health", description = "Liveness"),
        (name = "payments", description = "Payment creation and lookup"),
        (name = "webhooks", description = "Gateway notifications"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_relay_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/create-payment",
            "/api/payments/pix",
            "/payment-status/{id}",
            "/webhook/mercadopago",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
