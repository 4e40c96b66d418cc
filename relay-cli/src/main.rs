//! Relay CLI
//!
//! Command-line interface for the PIX payment relay.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use relay_client::{RelayClient, payment_request};
use relay_gateway::fulfillment::SIGNATURE_HEADER;
use relay_gateway::security::{mercadopago_manifest, sign_payload, verify_payload_signature};

#[derive(Parser)]
#[command(name = "relay")]
#[command(author, version, about = "PIX payment relay CLI client", long_about = None)]
struct Cli {
    /// Base URL of the relay
    #[arg(long, env = "RELAY_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a payment and print the full gateway record
    Create {
        #[command(flatten)]
        payment: PaymentArgs,
    },
    /// Create a payment and print only the PIX QR code data
    Pix {
        #[command(flatten)]
        payment: PaymentArgs,
    },
    /// Look up a payment by gateway id
    Status {
        /// Gateway payment id
        id: String,
    },
    /// Webhook operations
    Webhook {
        #[command(subcommand)]
        action: WebhookCommands,
    },
    /// Check relay health
    Health,
}

#[derive(clap::Args)]
struct PaymentArgs {
    /// Amount in BRL, e.g. 49.90
    #[arg(long)]
    amount: String,
    #[arg(long)]
    description: String,
    /// Payer email (the relay's default is used when omitted)
    #[arg(long)]
    email: Option<String>,
    /// Correlation id echoed back on the payment record
    #[arg(long)]
    reference: Option<String>,
}

#[derive(Subcommand)]
enum WebhookCommands {
    /// Deliver a gateway-style notification to the relay
    Send {
        /// Gateway payment id
        id: String,
        #[arg(long, default_value = "payment")]
        topic: String,
        /// Sign the delivery the way the gateway does
        #[arg(long, env = "MP_WEBHOOK_SECRET")]
        secret: Option<String>,
    },
    /// Run a local fulfillment endpoint that prints forwarded payments
    Listen {
        /// Port to listen on
        #[arg(long, default_value = "4000")]
        port: u16,
        /// Verify the relay's signature header with this secret
        #[arg(long, env = "FULFILLMENT_SECRET")]
        secret: Option<String>,
    },
}

impl PaymentArgs {
    fn into_request(self) -> relay_types::CreatePaymentRequest {
        let mut req = payment_request(&self.amount, &self.description);
        req.user_email = self.email;
        req.external_reference = self.reference;
        req
    }
}

/// Builds `x-signature` and `x-request-id` values for a delivery.
fn sign_delivery(payment_id: &str, secret: &str) -> (String, String) {
    let request_id = uuid::Uuid::new_v4().to_string();
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string();
    let manifest = mercadopago_manifest(Some(payment_id), Some(&request_id), &ts);
    let v1 = sign_payload(manifest.as_bytes(), secret);
    (format!("ts={ts},v1={v1}"), request_id)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = RelayClient::new(&cli.api_url);

    match cli.command {
        Commands::Health => match client.health().await {
            Ok(health) => println!("✓ {} ({})", health.status, health.timestamp),
            Err(e) => {
                println!("✗ Relay is not healthy: {e}");
                std::process::exit(1);
            }
        },

        Commands::Create { payment } => {
            let record = client.create_payment(&payment.into_request()).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        Commands::Pix { payment } => {
            let pix = client.create_pix_payment(&payment.into_request()).await?;
            println!("{}", serde_json::to_string_pretty(&pix)?);
        }

        Commands::Status { id } => {
            let record = client.payment_status(&id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        Commands::Webhook { action } => match action {
            WebhookCommands::Send { id, topic, secret } => {
                let signature = secret.as_deref().map(|s| sign_delivery(&id, s));
                client
                    .send_webhook(
                        &topic,
                        &id,
                        signature.as_ref().map(|(sig, req)| (sig.as_str(), req.as_str())),
                    )
                    .await?;
                println!("✓ Notification for {id} delivered");
            }
            WebhookCommands::Listen { port, secret } => {
                let app = axum::Router::new()
                    .route("/fulfill", axum::routing::post(handle_fulfillment))
                    .with_state(Arc::new(secret));
                let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
                println!("Listening for fulfillments on http://{}/fulfill", addr);
                let listener = tokio::net::TcpListener::bind(&addr).await?;
                axum::serve(listener, app).await?;
            }
        },
    }

    Ok(())
}

async fn handle_fulfillment(
    axum::extract::State(secret): axum::extract::State<Arc<Option<String>>>,
    headers: axum::http::HeaderMap,
    body: String,
) -> axum::http::StatusCode {
    println!("POST /fulfill HTTP/1.1");
    for (name, value) in &headers {
        println!("{}: {:?}", name, value);
    }
    println!();
    println!("{}", body);

    if let Some(secret) = secret.as_deref() {
        let valid = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|sig| verify_payload_signature(body.as_bytes(), sig, secret));
        if !valid {
            println!("✗ signature mismatch, rejecting");
            println!("----------------------------------------");
            return axum::http::StatusCode::UNAUTHORIZED;
        }
        println!("✓ signature verified");
    }
    println!("----------------------------------------");
    axum::http::StatusCode::OK
}
