//! HTTP request handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use relay_types::{
    AppError, CreatePaymentRequest, FulfillmentError, FulfillmentHook, HealthResponse,
    PaymentGateway, WebhookError, WebhookNotification, WebhookOutcome,
};

use crate::RelayService;

/// Largest webhook body the relay reads. Larger bodies are treated as
/// malformed and still acknowledged.
pub const WEBHOOK_BODY_LIMIT: usize = 256 * 1024;

/// Application state shared across handlers.
pub struct AppState<G: PaymentGateway, F: FulfillmentHook> {
    pub service: RelayService<G, F>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

/// Body extraction failures (bad JSON, wrong field types, missing
/// `Content-Type`) use the same error shape as validation failures.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(AppError::BadRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::Upstream { message, details } => (StatusCode::BAD_GATEWAY, message, details),
            AppError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg, None),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        let mut body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });
        if let Some(details) = details {
            body["details"] = serde_json::Value::String(details);
        }

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "Payment relay online".to_string(),
        timestamp: Utc::now(),
    })
}

/// Create a PIX payment and return the full gateway record.
#[tracing::instrument(skip(state, payload), fields(description = tracing::field::Empty))]
pub async fn create_payment<G: PaymentGateway, F: FulfillmentHook>(
    State(state): State<Arc<AppState<G, F>>>,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    tracing::Span::current().record("description", req.description.as_str());
    let record = state.service.create_payment(req).await?;
    Ok(Json(record))
}

/// Create a PIX payment and return only the presentment fields.
#[tracing::instrument(skip(state, payload), fields(description = tracing::field::Empty))]
pub async fn create_pix_payment<G: PaymentGateway, F: FulfillmentHook>(
    State(state): State<Arc<AppState<G, F>>>,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    tracing::Span::current().record("description", req.description.as_str());
    let pix = state.service.create_pix_payment(req).await?;
    Ok(Json(pix))
}

/// Look up a payment by gateway id.
#[tracing::instrument(skip(state), fields(payment_id = %id))]
pub async fn payment_status<G: PaymentGateway, F: FulfillmentHook>(
    State(state): State<Arc<AppState<G, F>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.service.get_payment(&id).await?;
    Ok(Json(record))
}

/// Gateway notification receiver.
///
/// Always answers `200 OK`. Processing runs on its own task so a panic in
/// an adapter is contained and logged instead of failing the response.
pub async fn mercadopago_webhook<G: PaymentGateway, F: FulfillmentHook>(
    State(state): State<Arc<AppState<G, F>>>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    headers: HeaderMap,
    body: Body,
) -> impl IntoResponse {
    let query = match query {
        Ok(Query(q)) => q,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable webhook query string");
            HashMap::new()
        }
    };
    let payload = match axum::body::to_bytes(body, WEBHOOK_BODY_LIMIT).await {
        Ok(bytes) => {
            let payload = serde_json::from_slice::<serde_json::Value>(&bytes).ok();
            if payload.is_none() && !bytes.is_empty() {
                tracing::warn!(len = bytes.len(), "webhook body is not valid JSON");
            }
            payload
        }
        Err(e) => {
            tracing::warn!(error = %e, limit = WEBHOOK_BODY_LIMIT, "webhook body unreadable");
            None
        }
    };

    let notification = WebhookNotification::from_parts(&query, payload.as_ref());
    tracing::info!(
        topic = ?notification.topic,
        payment_id = ?notification.payment_id,
        "webhook received"
    );

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let data_id = query
        .get("data.id")
        .map(String::as_str)
        .or_else(|| notification.payment_id.as_ref().map(|id| id.as_str()));

    if !state
        .service
        .verify_webhook_signature(header("x-signature"), header("x-request-id"), data_id)
    {
        tracing::warn!(outcome = ?WebhookOutcome::Unauthenticated, "webhook signature rejected");
        return (StatusCode::OK, "OK");
    }

    let task_state = state.clone();
    let task = tokio::spawn(async move {
        task_state.service.handle_notification(&notification).await
    });

    match task.await {
        Ok(Ok(outcome)) => tracing::info!(?outcome, "webhook processed"),
        Ok(Err(WebhookError::Fulfillment(FulfillmentError::NotImplemented))) => {
            tracing::warn!("approved payment left unfulfilled: no fulfillment hook configured")
        }
        Ok(Err(e)) => tracing::error!(error = %e, "webhook processing failed"),
        Err(e) => tracing::error!(error = %e, "webhook processing panicked"),
    }

    (StatusCode::OK, "OK")
}
