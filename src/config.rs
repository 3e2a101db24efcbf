//! Engine configuration loaded from environment variables.

use crate::error::ConfigError;
use url::Url;

const DEFAULT_STRIPE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Stripe endpoint secret (`whsec_...`). The Stripe adapter is only
    /// registered when this is set.
    pub stripe_webhook_secret: Option<String>,
    /// Maximum accepted age of a Stripe signature timestamp.
    pub stripe_tolerance_secs: i64,
    /// Merchant address PayPal IPNs must be addressed to. The PayPal adapter
    /// is only registered when this is set.
    pub paypal_receiver_email: Option<String>,
    /// IPN validation endpoint. When set every IPN is posted back before it
    /// is trusted.
    pub paypal_ipn_verify_url: Option<Url>,
    /// Cache campaign funding totals between transitions.
    pub snapshot_cache: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stripe_webhook_secret: None,
            stripe_tolerance_secs: DEFAULT_STRIPE_TOLERANCE_SECS,
            paypal_receiver_email: None,
            paypal_ipn_verify_url: None,
            snapshot_cache: true,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let stripe_tolerance_secs = match non_empty("STRIPE_TOLERANCE_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: "STRIPE_TOLERANCE_SECS",
                    value: raw,
                })?,
            None => DEFAULT_STRIPE_TOLERANCE_SECS,
        };

        let snapshot_cache = match non_empty("SNAPSHOT_CACHE") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "on" | "true" | "1" => true,
                "off" | "false" | "0" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "SNAPSHOT_CACHE",
                        value: raw,
                    });
                }
            },
            None => true,
        };

        let paypal_ipn_verify_url = non_empty("PAYPAL_IPN_VERIFY_URL")
            .map(|raw| {
                Url::parse(raw.trim()).map_err(|_| ConfigError::InvalidValue {
                    key: "PAYPAL_IPN_VERIFY_URL",
                    value: raw,
                })
            })
            .transpose()?;

        Ok(Self {
            stripe_webhook_secret: non_empty("STRIPE_WEBHOOK_SECRET"),
            stripe_tolerance_secs,
            paypal_receiver_email: non_empty("PAYPAL_RECEIVER_EMAIL"),
            paypal_ipn_verify_url,
            snapshot_cache,
        })
    }
}
