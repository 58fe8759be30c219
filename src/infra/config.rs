//! Centralized configuration (environment variables + defaults).
//!
//! Gateway sections are all-or-nothing: a gateway is enabled only when every
//! required variable for it is present, and a partially configured gateway is
//! reported as an error rather than silently disabled.

use crate::domain::money::{normalize_currency, Money};
use crate::domain::revenue::FeeSchedule;
use crate::error::{AppError, Result};
use std::collections::HashMap;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_PAYPAL_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
pub const DEFAULT_MOMO_BASE_URL: &str = "https://sandbox.momodeveloper.mtn.com";

#[derive(Debug, Clone)]
pub struct BaasConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone)]
pub struct MobileMoneyConfig {
    pub base_url: String,
    pub subscription_key: String,
    pub api_user: String,
    pub api_key: String,
    pub target_environment: String,
    pub callback_url: Option<String>,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub webhook_id: Option<String>,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct CdnConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub fees: FeeSchedule,
    pub monthly_price: Money,
    pub yearly_price: Money,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            monthly_price: Money {
                minor: 499,
                currency: "USD".to_string(),
            },
            yearly_price: Money {
                minor: 4999,
                currency: "USD".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Absent means the in-memory store (development only).
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub baas: BaasConfig,
    pub mobile_money: Option<MobileMoneyConfig>,
    pub paypal: Option<PaypalConfig>,
    pub cdn: Option<CdnConfig>,
    pub billing: BillingConfig,
}

/// Variable lookup; the process environment in production, a map in tests.
struct Vars<'a> {
    get: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl<'a> Vars<'a> {
    fn opt(&self, key: &str) -> Option<String> {
        (self.get)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.opt(key)
            .ok_or_else(|| AppError::Config(format!("{} must be set", key)))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.opt(key) {
            Some(v) => v
                .parse::<T>()
                .map_err(|_| AppError::Config(format!("{} has an invalid value '{}'", key, v))),
            None => Ok(default),
        }
    }

    /// `false` when none of `keys` are set, an error when only some are.
    fn section(&self, name: &str, keys: &[&str]) -> Result<bool> {
        let missing: Vec<&str> = keys.iter().copied().filter(|k| self.opt(k).is_none()).collect();
        if missing.len() == keys.len() {
            return Ok(false);
        }
        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "{} is partially configured; missing {}",
                name,
                missing.join(", ")
            )));
        }
        Ok(true)
    }
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(Vars {
            get: Box::new(|k: &str| std::env::var(k).ok()),
        })
    }

    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        Self::from_vars(Vars {
            get: Box::new(move |k: &str| map.get(k).cloned()),
        })
    }

    fn from_vars(vars: Vars<'_>) -> Result<Self> {
        let baas = BaasConfig {
            url: vars.required("BAAS_URL")?.trim_end_matches('/').to_string(),
            anon_key: vars.required("BAAS_ANON_KEY")?,
        };

        let mobile_money = if vars.section(
            "mobile money",
            &["MOMO_SUBSCRIPTION_KEY", "MOMO_API_USER", "MOMO_API_KEY"],
        )? {
            Some(MobileMoneyConfig {
                base_url: vars
                    .or("MOMO_BASE_URL", DEFAULT_MOMO_BASE_URL)
                    .trim_end_matches('/')
                    .to_string(),
                subscription_key: vars.required("MOMO_SUBSCRIPTION_KEY")?,
                api_user: vars.required("MOMO_API_USER")?,
                api_key: vars.required("MOMO_API_KEY")?,
                target_environment: vars.or("MOMO_TARGET_ENVIRONMENT", "sandbox"),
                callback_url: vars.opt("MOMO_CALLBACK_URL"),
                webhook_secret: vars.opt("MOMO_WEBHOOK_SECRET"),
            })
        } else {
            None
        };

        let paypal = if vars.section(
            "PayPal",
            &[
                "PAYPAL_CLIENT_ID",
                "PAYPAL_CLIENT_SECRET",
                "PAYPAL_RETURN_URL",
                "PAYPAL_CANCEL_URL",
            ],
        )? {
            Some(PaypalConfig {
                base_url: vars
                    .or("PAYPAL_BASE_URL", DEFAULT_PAYPAL_BASE_URL)
                    .trim_end_matches('/')
                    .to_string(),
                client_id: vars.required("PAYPAL_CLIENT_ID")?,
                client_secret: vars.required("PAYPAL_CLIENT_SECRET")?,
                webhook_id: vars.opt("PAYPAL_WEBHOOK_ID"),
                return_url: vars.required("PAYPAL_RETURN_URL")?,
                cancel_url: vars.required("PAYPAL_CANCEL_URL")?,
            })
        } else {
            None
        };

        let cdn = if vars.section("CDN", &["CDN_CLOUD_NAME", "CDN_API_KEY", "CDN_API_SECRET"])? {
            Some(CdnConfig {
                cloud_name: vars.required("CDN_CLOUD_NAME")?,
                api_key: vars.required("CDN_API_KEY")?,
                api_secret: vars.required("CDN_API_SECRET")?,
            })
        } else {
            None
        };

        let fee_percent: u32 = vars.parsed("PLATFORM_FEE_PERCENT", 10)?;
        let currency = normalize_currency(&vars.or("SUBSCRIPTION_CURRENCY", "USD"))
            .map_err(|e| AppError::Config(format!("SUBSCRIPTION_CURRENCY: {}", e)))?;
        let price = |key: &str, default: &str| -> Result<Money> {
            let raw = vars.or(key, default);
            let money = Money::parse_decimal(&raw, &currency)
                .map_err(|e| AppError::Config(format!("{}: {}", key, e)))?;
            if money.minor == 0 {
                return Err(AppError::Config(format!("{} must be greater than zero", key)));
            }
            Ok(money)
        };
        let billing = BillingConfig {
            fees: FeeSchedule::new(fee_percent)?,
            monthly_price: price("SUBSCRIPTION_MONTHLY_PRICE", "4.99")?,
            yearly_price: price("SUBSCRIPTION_YEARLY_PRICE", "49.99")?,
        };

        Ok(Self {
            bind_addr: vars.or("BIND_ADDR", DEFAULT_BIND_ADDR),
            database_url: vars.opt("DATABASE_URL"),
            db_max_connections: vars.parsed("DB_MAX_CONNECTIONS", 5)?,
            baas,
            mobile_money,
            paypal,
            cdn,
            billing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        map.entry("BAAS_URL".into())
            .or_insert_with(|| "https://project.example.co/".into());
        map.entry("BAAS_ANON_KEY".into()).or_insert_with(|| "anon".into());
        map
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = AppConfig::from_map(&vars(&[])).unwrap();
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.baas.url, "https://project.example.co");
        assert!(cfg.database_url.is_none());
        assert!(cfg.mobile_money.is_none() && cfg.paypal.is_none() && cfg.cdn.is_none());
        assert_eq!(cfg.billing.fees.platform_percent(), 10);
        assert_eq!(cfg.billing.monthly_price.minor, 499);
    }

    #[test]
    fn missing_baas_is_an_error() {
        let err = AppConfig::from_map(&HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("BAAS_URL"));
    }

    #[test]
    fn partial_gateway_section_is_rejected() {
        let err = AppConfig::from_map(&vars(&[("PAYPAL_CLIENT_ID", "abc")])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("PayPal"), "{}", msg);
        assert!(msg.contains("PAYPAL_CLIENT_SECRET"), "{}", msg);
    }

    #[test]
    fn full_mobile_money_section_is_loaded() {
        let cfg = AppConfig::from_map(&vars(&[
            ("MOMO_SUBSCRIPTION_KEY", "sub"),
            ("MOMO_API_USER", "user"),
            ("MOMO_API_KEY", "key"),
            ("MOMO_WEBHOOK_SECRET", "shh"),
        ]))
        .unwrap();
        let momo = cfg.mobile_money.unwrap();
        assert_eq!(momo.base_url, DEFAULT_MOMO_BASE_URL);
        assert_eq!(momo.target_environment, "sandbox");
        assert_eq!(momo.webhook_secret.as_deref(), Some("shh"));
    }

    #[test]
    fn billing_values_are_validated() {
        assert!(AppConfig::from_map(&vars(&[("PLATFORM_FEE_PERCENT", "120")])).is_err());
        assert!(AppConfig::from_map(&vars(&[("PLATFORM_FEE_PERCENT", "ten")])).is_err());
        assert!(AppConfig::from_map(&vars(&[("SUBSCRIPTION_MONTHLY_PRICE", "0")])).is_err());
        let cfg = AppConfig::from_map(&vars(&[
            ("SUBSCRIPTION_CURRENCY", "ugx"),
            ("SUBSCRIPTION_MONTHLY_PRICE", "10000"),
            ("SUBSCRIPTION_YEARLY_PRICE", "100000"),
        ]))
        .unwrap();
        assert_eq!(cfg.billing.monthly_price.currency, "UGX");
        assert_eq!(cfg.billing.monthly_price.minor, 10000);
    }
}
