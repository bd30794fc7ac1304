use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::client::checkout::CheckoutConfig;
use crate::domain::pricing::PricingPolicy;
use crate::infrastructure::stripe::DEFAULT_API_BASE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

fn parse<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Server settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Without a database URL the server keeps carts in memory.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub payment_api_base: String,
    pub payment_secret_key: String,
    pub currency: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse("PORT", lookup("PORT"), 8080)?,
            payment_api_base: lookup("PAYMENT_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            payment_secret_key: lookup("PAYMENT_SECRET_KEY")
                .ok_or(ConfigError::Missing("PAYMENT_SECRET_KEY"))?,
            currency: lookup("CURRENCY").unwrap_or_else(|| "usd".to_string()),
        })
    }
}

/// Settings for the storefront client: where the store API and payment
/// provider live, and how checkout is priced.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub store_api_url: String,
    pub payment_api_base: String,
    pub payment_publishable_key: String,
    pub checkout: CheckoutConfig,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = CheckoutConfig::default();
        let pricing = PricingPolicy {
            tax_rate: parse::<BigDecimal>("TAX_RATE", lookup("TAX_RATE"), defaults.pricing.tax_rate)?,
            flat_fee: parse::<BigDecimal>("FLAT_FEE", lookup("FLAT_FEE"), defaults.pricing.flat_fee)?,
        };
        let delay_ms = parse(
            "CHECKOUT_REDIRECT_DELAY_MS",
            lookup("CHECKOUT_REDIRECT_DELAY_MS"),
            u64::try_from(defaults.redirect_delay.as_millis()).unwrap_or(u64::MAX),
        )?;

        Ok(Self {
            store_api_url: lookup("STORE_API_URL").ok_or(ConfigError::Missing("STORE_API_URL"))?,
            payment_api_base: lookup("PAYMENT_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            payment_publishable_key: lookup("PAYMENT_PUBLISHABLE_KEY")
                .ok_or(ConfigError::Missing("PAYMENT_PUBLISHABLE_KEY"))?,
            checkout: CheckoutConfig {
                pricing,
                currency: lookup("CURRENCY").unwrap_or(defaults.currency),
                max_intent_attempts: parse(
                    "CHECKOUT_MAX_INTENT_ATTEMPTS",
                    lookup("CHECKOUT_MAX_INTENT_ATTEMPTS"),
                    defaults.max_intent_attempts,
                )?,
                redirect_delay: Duration::from_millis(delay_ms),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn server_defaults_apply() {
        let config = AppConfig::from_lookup(lookup(&[("PAYMENT_SECRET_KEY", "sk_test")])).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert!(config.database_url.is_none());
        assert_eq!(config.payment_api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn missing_secret_key_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PAYMENT_SECRET_KEY")));
    }

    #[test]
    fn invalid_port_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[
            ("PAYMENT_SECRET_KEY", "sk_test"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn client_pricing_overrides_are_parsed() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("STORE_API_URL", "http://localhost:8080"),
            ("PAYMENT_PUBLISHABLE_KEY", "pk_test"),
            ("TAX_RATE", "0.0825"),
            ("CHECKOUT_MAX_INTENT_ATTEMPTS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.checkout.pricing.tax_rate, BigDecimal::from_str("0.0825").unwrap());
        assert_eq!(config.checkout.pricing.flat_fee, BigDecimal::from(5));
        assert_eq!(config.checkout.max_intent_attempts, 5);
        assert_eq!(config.checkout.redirect_delay, Duration::from_secs(3));
    }

    #[test]
    fn redirect_delay_override_is_in_milliseconds() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("STORE_API_URL", "http://localhost:8080"),
            ("PAYMENT_PUBLISHABLE_KEY", "pk_test"),
            ("CHECKOUT_REDIRECT_DELAY_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.checkout.redirect_delay, Duration::from_millis(1500));
    }
}
