//! Runtime configuration read from the environment.
//! Values are external; only the variable names live here.

use std::time::Duration;

use crate::billing::PriceTiers;

pub const ENV_HTTP_PORT: &str = "CREDLIO_HTTP_PORT";
pub const ENV_AUTH_URL: &str = "CREDLIO_AUTH_URL";
pub const ENV_AUTH_ANON_KEY: &str = "CREDLIO_AUTH_ANON_KEY";
pub const ENV_AUTH_SERVICE_KEY: &str = "CREDLIO_AUTH_SERVICE_KEY";
pub const ENV_STRIPE_SECRET_KEY: &str = "CREDLIO_STRIPE_SECRET_KEY";
pub const ENV_STRIPE_PRICE_TIER_1: &str = "CREDLIO_STRIPE_PRICE_TIER_1";
pub const ENV_STRIPE_PRICE_TIER_2: &str = "CREDLIO_STRIPE_PRICE_TIER_2";
pub const ENV_PRODUCTION_READY: &str = "CREDLIO_PRODUCTION_READY";
pub const ENV_ENFORCE_PRODUCTION: &str = "CREDLIO_ENFORCE_PRODUCTION";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "CREDLIO_CONNECT_TIMEOUT_SECS";

pub const DEFAULT_HTTP_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("production enforcement is on but CREDLIO_PRODUCTION_READY is not set")]
    NotProductionReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub http_port: u16,
    pub auth_url: Option<String>,
    pub auth_anon_key: Option<String>,
    pub auth_service_key: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub price_tiers: PriceTiers,
    pub production_ready: bool,
    pub enforce_production: bool,
    pub connect_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            auth_url: None,
            auth_anon_key: None,
            auth_service_key: None,
            stripe_secret_key: None,
            price_tiers: PriceTiers::default(),
            production_ready: false,
            enforce_production: false,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

pub fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any name -> value lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let get_bool = |name: &'static str| -> Result<bool, ConfigError> {
            match get(name) {
                None => Ok(false),
                Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid { name, value: v }),
            }
        };

        let mut cfg = AppConfig::default();
        if let Some(v) = get(ENV_HTTP_PORT) {
            cfg.http_port = v.parse().map_err(|_| ConfigError::Invalid { name: ENV_HTTP_PORT, value: v.clone() })?;
        }
        if let Some(v) = get(ENV_CONNECT_TIMEOUT_SECS) {
            let secs: u64 = v.parse().map_err(|_| ConfigError::Invalid { name: ENV_CONNECT_TIMEOUT_SECS, value: v.clone() })?;
            cfg.connect_timeout = Duration::from_secs(secs);
        }
        cfg.auth_url = get(ENV_AUTH_URL);
        cfg.auth_anon_key = get(ENV_AUTH_ANON_KEY);
        cfg.auth_service_key = get(ENV_AUTH_SERVICE_KEY);
        cfg.stripe_secret_key = get(ENV_STRIPE_SECRET_KEY);
        cfg.price_tiers = PriceTiers { basic: get(ENV_STRIPE_PRICE_TIER_1), premium: get(ENV_STRIPE_PRICE_TIER_2) };
        cfg.production_ready = get_bool(ENV_PRODUCTION_READY)?;
        cfg.enforce_production = get_bool(ENV_ENFORCE_PRODUCTION)?;
        Ok(cfg)
    }

    /// Startup checks. The backend URL and anon key are always required; a production-ready
    /// deployment also needs the service key, the payment key and both price tiers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enforce_production && !self.production_ready {
            return Err(ConfigError::NotProductionReady);
        }
        if self.auth_url.is_none() {
            return Err(ConfigError::Missing(ENV_AUTH_URL));
        }
        if self.auth_anon_key.is_none() {
            return Err(ConfigError::Missing(ENV_AUTH_ANON_KEY));
        }
        if self.production_ready {
            if self.auth_service_key.is_none() {
                return Err(ConfigError::Missing(ENV_AUTH_SERVICE_KEY));
            }
            if self.stripe_secret_key.is_none() {
                return Err(ConfigError::Missing(ENV_STRIPE_SECRET_KEY));
            }
            if self.price_tiers.basic.is_none() {
                return Err(ConfigError::Missing(ENV_STRIPE_PRICE_TIER_1));
            }
            if self.price_tiers.premium.is_none() {
                return Err(ConfigError::Missing(ENV_STRIPE_PRICE_TIER_2));
            }
        }
        Ok(())
    }
}
