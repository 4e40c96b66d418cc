//! Fulfillment hook selected at startup.

use async_trait::async_trait;
use relay_gateway::{HttpFulfillment, NotImplementedFulfillment};
use relay_types::{FulfillmentError, FulfillmentHook, PaymentRecord};

use crate::config::Config;

/// Either forwards approved payments or reports the missing collaborator.
pub enum ConfiguredFulfillment {
    Http(HttpFulfillment),
    Missing(NotImplementedFulfillment),
}

impl ConfiguredFulfillment {
    pub fn from_config(config: &Config) -> Self {
        match &config.fulfillment_url {
            Some(url) => Self::Http(HttpFulfillment::new(
                url.clone(),
                config.fulfillment_secret.clone(),
            )),
            None => Self::Missing(NotImplementedFulfillment),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Http(_) => "http forwarder",
            Self::Missing(_) => "none (approved payments are logged only)",
        }
    }
}

#[async_trait]
impl FulfillmentHook for ConfiguredFulfillment {
    async fn fulfill(&self, payment: &PaymentRecord) -> Result<(), FulfillmentError> {
        match self {
            Self::Http(hook) => hook.fulfill(payment).await,
            Self::Missing(hook) => hook.fulfill(payment).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::PaymentStatus;

    fn config(url: Option<&str>) -> Config {
        Config::from_lookup(|key| match key {
            "MP_ACCESS_TOKEN" => Some("t".to_string()),
            "FULFILLMENT_URL" => url.map(str::to_string),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_selects_http_when_url_configured() {
        let hook = ConfiguredFulfillment::from_config(&config(Some("http://orders.test/paid")));
        assert!(matches!(hook, ConfiguredFulfillment::Http(_)));
    }

    #[tokio::test]
    async fn test_missing_url_reports_not_implemented() {
        let hook = ConfiguredFulfillment::from_config(&config(None));
        let result = hook
            .fulfill(&PaymentRecord::new("1", PaymentStatus::Approved))
            .await;
        assert!(matches!(result, Err(FulfillmentError::NotImplemented)));
    }
}
