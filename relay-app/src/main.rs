//! # Relay Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the MercadoPago gateway adapter
//! - Pick the fulfillment hook
//! - Start the HTTP server

mod config;
mod fulfillment;

use anyhow::Context;
use opentelemetry::global;
use opentelemetry_sdk::{
    metrics::SdkMeterProvider, propagation::TraceContextPropagator, trace as sdktrace,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_gateway::{IdempotentFulfillment, MercadoPagoGateway};
use relay_hex::{RelayService, inbound::HttpServer};

use crate::fulfillment::ConfiguredFulfillment;

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
        .context("failed to create OTLP span exporter")?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("payment-relay"), provider))
}

/// Global meter provider read by the HTTP metrics layer.
fn init_meter() -> anyhow::Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()
        .context("failed to create OTLP metric exporter")?;

    let provider = SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .build();

    global::set_meter_provider(provider.clone());
    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize OpenTelemetry tracing and metrics
    let (otel_tracer, otel_provider) = init_tracer()?;
    let meter_provider = init_meter()?;
    let telemetry = tracing_opentelemetry::layer().with_tracer(otel_tracer);

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,relay_app=debug,relay_hex=debug,relay_gateway=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting payment relay on port {}", config.port);
    tracing::debug!(?config, "configuration loaded");
    if config.trust_forwarded_for {
        tracing::info!("Rate limiting keyed on X-Forwarded-For");
    }
    if config.webhook_secret.is_none() {
        tracing::warn!("MP_WEBHOOK_SECRET not set, webhook signatures will not be verified");
    }

    let gateway = MercadoPagoGateway::new(config.gateway_config())
        .context("failed to build MercadoPago client")?;

    let hook = ConfiguredFulfillment::from_config(&config);
    tracing::info!("Fulfillment hook: {}", hook.describe());

    let service = RelayService::with_config(
        gateway,
        IdempotentFulfillment::new(hook),
        config.relay_config(),
    );

    // Create and run the HTTP server
    let server = HttpServer::with_rate_limiter(service, config.rate_limiter());
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces and metrics are flushed before exit
    let _ = otel_provider.shutdown();
    let _ = meter_provider.shutdown();
    Ok(())
}
