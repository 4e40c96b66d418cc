//! Configuration loading from environment.

use std::env;
use std::fmt;
use std::time::Duration;

use anyhow::Context;
use relay_gateway::mercadopago::DEFAULT_BASE_URL;
use relay_gateway::{MercadoPagoConfig, RetryPolicy};
use relay_hex::RelayConfig;
use relay_hex::inbound::RateLimiterState;
use relay_types::PayerDefaults;

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub mp_access_token: String,
    pub mp_base_url: String,
    pub mp_timeout: Duration,
    pub mp_max_attempts: u32,
    pub mp_retry_base: Duration,
    pub notification_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub payer_defaults: PayerDefaults,
    pub fulfillment_url: Option<String>,
    pub fulfillment_secret: Option<String>,
    pub create_rate_limit_per_minute: u32,
    pub trust_forwarded_for: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let parsed = |key: &'static str, default: u64| -> anyhow::Result<u64> {
            match var(key) {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("{key} must be a non-negative integer, got {raw:?}")),
                None => Ok(default),
            }
        };

        let port = u16::try_from(parsed("PORT", 3000)?).context("PORT is out of range")?;

        let mp_access_token = var("MP_ACCESS_TOKEN")
            .ok_or_else(|| anyhow::anyhow!("MP_ACCESS_TOKEN environment variable is required"))?;

        let defaults = PayerDefaults::default();
        let payer_defaults = PayerDefaults {
            email: var("DEFAULT_PAYER_EMAIL").unwrap_or(defaults.email),
            first_name: var("DEFAULT_PAYER_FIRST_NAME").unwrap_or(defaults.first_name),
            last_name: var("DEFAULT_PAYER_LAST_NAME").unwrap_or(defaults.last_name),
        };

        let mp_max_attempts = u32::try_from(parsed("MP_MAX_ATTEMPTS", 3)?)
            .context("MP_MAX_ATTEMPTS is out of range")?
            .max(1);
        let create_rate_limit_per_minute =
            u32::try_from(parsed("CREATE_RATE_LIMIT_PER_MINUTE", 60)?)
                .context("CREATE_RATE_LIMIT_PER_MINUTE is out of range")?;
        let trust_forwarded_for = match var("TRUST_FORWARDED_FOR") {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => anyhow::bail!("TRUST_FORWARDED_FOR must be true or false, got {raw:?}"),
            },
            None => false,
        };

        Ok(Self {
            port,
            mp_access_token,
            mp_base_url: var("MP_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            mp_timeout: Duration::from_millis(parsed("MP_TIMEOUT_MS", 5000)?),
            mp_max_attempts,
            mp_retry_base: Duration::from_millis(parsed("MP_RETRY_BASE_MS", 200)?),
            notification_url: var("MP_NOTIFICATION_URL"),
            webhook_secret: var("MP_WEBHOOK_SECRET"),
            payer_defaults,
            fulfillment_url: var("FULFILLMENT_URL"),
            fulfillment_secret: var("FULFILLMENT_SECRET"),
            create_rate_limit_per_minute,
            trust_forwarded_for,
        })
    }

    pub fn gateway_config(&self) -> MercadoPagoConfig {
        MercadoPagoConfig {
            base_url: self.mp_base_url.clone(),
            access_token: self.mp_access_token.clone(),
            timeout: self.mp_timeout,
            retry: RetryPolicy {
                max_attempts: self.mp_max_attempts,
                base_delay: self.mp_retry_base,
            },
        }
    }

    pub fn rate_limiter(&self) -> RateLimiterState {
        RateLimiterState::new(self.create_rate_limit_per_minute)
            .trust_forwarded_for(self.trust_forwarded_for)
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            payer_defaults: self.payer_defaults.clone(),
            notification_url: self.notification_url.clone(),
            webhook_secret: self.webhook_secret.clone(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("mp_access_token", &"<redacted>")
            .field("mp_base_url", &self.mp_base_url)
            .field("mp_timeout", &self.mp_timeout)
            .field("mp_max_attempts", &self.mp_max_attempts)
            .field("mp_retry_base", &self.mp_retry_base)
            .field("notification_url", &self.notification_url)
            .field("webhook_secret", &redacted(&self.webhook_secret))
            .field("payer_defaults", &self.payer_defaults)
            .field("fulfillment_url", &self.fulfillment_url)
            .field("fulfillment_secret", &redacted(&self.fulfillment_secret))
            .field(
                "create_rate_limit_per_minute",
                &self.create_rate_limit_per_minute,
            )
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .finish()
    }
}
