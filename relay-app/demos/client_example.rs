//! Client example walking through a full PIX flow against a local relay.
//!
//! Run with: cargo run -p relay-app --example client_example --features memory

use std::net::SocketAddr;
use std::sync::Arc;

use relay_client::{RelayClient, payment_request};
use relay_gateway::{IdempotentFulfillment, InMemoryGateway, NotImplementedFulfillment};
use relay_hex::{RelayService, inbound::HttpServer};
use relay_types::{PaymentId, PaymentStatus};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;

    println!("🚀 Starting relay on {addr} (in-memory gateway)...");

    // Keep a handle on the gateway so the demo can play the payer's bank
    let gateway = Arc::new(InMemoryGateway::new());
    let service = RelayService::new(
        gateway.clone(),
        IdempotentFulfillment::new(NotImplementedFulfillment),
    );
    let router = HttpServer::new(service).router();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router.into_make_service()).await {
            eprintln!("server error: {e}");
        }
    });

    let client = RelayClient::new(format!("http://{addr}"));

    // ─────────────────────────────────────────────────────────────────────────
    // Demo: PIX payment flow
    // ─────────────────────────────────────────────────────────────────────────

    let health = client.health().await?;
    println!("✅ Relay health: {} at {}", health.status, health.timestamp);

    let rejected = client.create_payment(&payment_request("abc", "Premium")).await;
    if let Err(e) = rejected {
        println!("✅ Bad amount rejected: {e}");
    }

    let mut req = payment_request("49.90", "SoundGuard Premium");
    req.user_email = Some("buyer@example.com".into());
    req.external_reference = Some("order-42".into());

    let pix = client.create_pix_payment(&req).await?;
    println!("✅ Created PIX payment {} ({})", pix.id, pix.status);
    if let Some(code) = &pix.qr_code {
        println!("   Copy-and-paste code: {code}");
    }

    // The payer completes the transfer in their bank app
    gateway.set_status(&PaymentId::new(pix.id.clone()), PaymentStatus::Approved)?;

    let record = client.payment_status(&pix.id).await?;
    println!(
        "✅ Status lookup: {} is {} (ref={:?})",
        record.id, record.status, record.external_reference
    );

    // The gateway notifies the relay; delivered twice as gateways do
    client.send_webhook("payment", &pix.id, None).await?;
    client.send_webhook("payment", &pix.id, None).await?;
    println!("✅ Webhook acknowledged (check the logs for the fulfillment outcome)");

    println!("\n🎉 Example completed successfully!");

    Ok(())
}
