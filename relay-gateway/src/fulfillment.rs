//! Fulfillment hook adapters.
//!
//! The order-management logic lives outside this service. These adapters
//! either mark that gap explicitly, forward approved payments to an external
//! collaborator, or guard another hook against double fulfillment.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use relay_types::{FulfillmentError, FulfillmentHook, PaymentId, PaymentRecord};
use tracing::{info, instrument, warn};

use crate::security::sign_payload;

/// Header carrying the HMAC-SHA256 of the forwarded body.
pub const SIGNATURE_HEADER: &str = "X-Relay-Signature";

/// Per-request timeout for the order-management endpoint.
pub const DEFAULT_FULFILLMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Hook used when no order-management collaborator is configured.
///
/// Always fails with `NotImplemented` so the missing business logic shows
/// up in logs and tests instead of being silently skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotImplementedFulfillment;

#[async_trait]
impl FulfillmentHook for NotImplementedFulfillment {
    async fn fulfill(&self, payment: &PaymentRecord) -> Result<(), FulfillmentError> {
        warn!(
            payment_id = %payment.id,
            external_reference = ?payment.external_reference,
            "approved payment has no fulfillment handler"
        );
        Err(FulfillmentError::NotImplemented)
    }
}

/// Forwards approved payments to an order-management endpoint.
pub struct HttpFulfillment {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
    timeout: Duration,
}

impl HttpFulfillment {
    pub fn new(url: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            secret,
            timeout: DEFAULT_FULFILLMENT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl FulfillmentHook for HttpFulfillment {
    #[instrument(skip(self, payment), fields(payment_id = %payment.id, url = %self.url))]
    async fn fulfill(&self, payment: &PaymentRecord) -> Result<(), FulfillmentError> {
        let body = serde_json::to_vec(payment)
            .map_err(|e| FulfillmentError::Failed(format!("serialize payment: {e}")))?;

        let mut request = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .timeout(self.timeout);

        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(&body, secret));
        }

        let resp = request
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FulfillmentError::Failed(format!(
                        "order service timed out after {:?}",
                        self.timeout
                    ))
                } else {
                    FulfillmentError::Failed(e.without_url().to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(FulfillmentError::Failed(format!(
                "order service returned HTTP {}",
                resp.status()
            )));
        }

        info!("payment forwarded for fulfillment");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    InFlight,
    Done,
}

/// Wraps a hook so each payment id is fulfilled at most once.
///
/// Ids are claimed before the inner hook runs, so concurrent deliveries of
/// the same notification run it only once. A failed run releases the claim.
/// State is in memory only and does not survive a restart.
pub struct IdempotentFulfillment<F: FulfillmentHook> {
    inner: F,
    claims: DashMap<PaymentId, Claim>,
}

impl<F: FulfillmentHook> IdempotentFulfillment<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            claims: DashMap::new(),
        }
    }

    /// Whether the inner hook has completed successfully for this id.
    pub fn is_fulfilled(&self, id: &PaymentId) -> bool {
        matches!(self.claims.get(id).as_deref(), Some(Claim::Done))
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: FulfillmentHook> FulfillmentHook for IdempotentFulfillment<F> {
    async fn fulfill(&self, payment: &PaymentRecord) -> Result<(), FulfillmentError> {
        match self.claims.entry(payment.id.clone()) {
            Entry::Occupied(existing) => {
                info!(
                    payment_id = %payment.id,
                    state = ?*existing.get(),
                    "payment already fulfilled or in progress, skipping"
                );
                return Ok(());
            }
            Entry::Vacant(slot) => {
                slot.insert(Claim::InFlight);
            }
        }

        let result = self.inner.fulfill(payment).await;
        match &result {
            Ok(()) => {
                self.claims.insert(payment.id.clone(), Claim::Done);
            }
            Err(_) => {
                self.claims.remove(&payment.id);
            }
        }
        result
    }
}
