use rasayan_order::FeeSchedule;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fees: FeeRates,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Fee-schedule rates as plain fractions (0.01 = 1%). Any rate left out of
/// the configuration falls back to the marketplace default.
#[derive(Debug, Deserialize, Clone)]
pub struct FeeRates {
    #[serde(default = "default_buyer_rate")]
    pub platform_fee_buyer_rate: f64,
    #[serde(default = "default_logistic_rate")]
    pub logistic_fee_rate: f64,
    #[serde(default = "default_seller_rate")]
    pub platform_fee_seller_rate: f64,
    #[serde(default = "default_safety_rate")]
    pub safety_fee_rate: f64,
    #[serde(default = "default_freight_rate")]
    pub freight_fee_rate: f64,
    #[serde(default = "default_gst_percent")]
    pub default_gst_percent: f64,
}

fn default_buyer_rate() -> f64 {
    0.01
}
fn default_logistic_rate() -> f64 {
    0.01
}
fn default_seller_rate() -> f64 {
    0.015
}
fn default_safety_rate() -> f64 {
    0.0025
}
fn default_freight_rate() -> f64 {
    0.01
}
fn default_gst_percent() -> f64 {
    18.0
}

impl Default for FeeRates {
    fn default() -> Self {
        Self {
            platform_fee_buyer_rate: default_buyer_rate(),
            logistic_fee_rate: default_logistic_rate(),
            platform_fee_seller_rate: default_seller_rate(),
            safety_fee_rate: default_safety_rate(),
            freight_fee_rate: default_freight_rate(),
            default_gst_percent: default_gst_percent(),
        }
    }
}

impl FeeRates {
    pub fn to_schedule(&self) -> FeeSchedule {
        let defaults = FeeSchedule::default();
        FeeSchedule {
            platform_fee_buyer_rate: Decimal::from_f64(self.platform_fee_buyer_rate)
                .unwrap_or(defaults.platform_fee_buyer_rate),
            logistic_fee_rate: Decimal::from_f64(self.logistic_fee_rate)
                .unwrap_or(defaults.logistic_fee_rate),
            platform_fee_seller_rate: Decimal::from_f64(self.platform_fee_seller_rate)
                .unwrap_or(defaults.platform_fee_seller_rate),
            safety_fee_rate: Decimal::from_f64(self.safety_fee_rate)
                .unwrap_or(defaults.safety_fee_rate),
            freight_fee_rate: Decimal::from_f64(self.freight_fee_rate)
                .unwrap_or(defaults.freight_fee_rate),
            default_gst_percent: Decimal::from_f64(self.default_gst_percent)
                .unwrap_or(defaults.default_gst_percent),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file is optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // RASAYAN__SERVER__PORT=8080 style environment overrides
            .add_source(config::Environment::with_prefix("RASAYAN").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
