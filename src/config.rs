// src/config.rs
use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use log::{info, warn};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::services::cache::{CachePolicy, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_STALE_AFTER_DAYS};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub rankings_source_url: String,
    pub city_breakdown_source_url: String,
    pub upstream_timeout_secs: u64,
    pub cache_stale_after_days: i64,
    pub cache_timezone: Tz,
    pub property_tax_rates_csv: PathBuf,
    pub place_categories_json: PathBuf,
    pub calculator_config_json: PathBuf,
}

fn load_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {} value '{}': {}", key, raw, e)),
        Err(_) => {
            info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}

fn load_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{} not set, using default: {}", key, default);
        default.to_string()
    })
}

impl AppConfig {
    /// Reads configuration from the environment. Call `dotenv().ok()` first to pick up `.env`.
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        if database_url.is_none() {
            warn!("DATABASE_URL not set, monthly cache will live in memory only");
        }

        let timezone_name = load_string("CACHE_TIMEZONE", "America/Toronto");
        let cache_timezone: Tz = timezone_name
            .parse()
            .map_err(|e| anyhow!("Invalid CACHE_TIMEZONE '{}': {}", timezone_name, e))?;

        let config = AppConfig {
            port: load_or("PORT", 3030u16)?,
            database_url,
            rankings_source_url: load_string("RANKINGS_SOURCE_URL", "http://localhost:8090/rankings"),
            city_breakdown_source_url: load_string(
                "CITY_BREAKDOWN_SOURCE_URL",
                "http://localhost:8090/cities/{key}",
            ),
            upstream_timeout_secs: load_or("UPSTREAM_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?,
            cache_stale_after_days: load_or("CACHE_STALE_AFTER_DAYS", DEFAULT_STALE_AFTER_DAYS)?,
            cache_timezone,
            property_tax_rates_csv: load_string("PROPERTY_TAX_RATES_CSV", "config/property_tax_rates.csv").into(),
            place_categories_json: load_string("PLACE_CATEGORIES_JSON", "config/place_categories.json").into(),
            calculator_config_json: load_string("CALCULATOR_CONFIG_JSON", "config/calculator.json").into(),
        };

        if config.upstream_timeout_secs == 0 {
            return Err(anyhow!("UPSTREAM_TIMEOUT_SECS must be greater than zero"));
        }
        if config.cache_stale_after_days < 0 {
            return Err(anyhow!("CACHE_STALE_AFTER_DAYS must not be negative"));
        }
        Ok(config)
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            stale_after: chrono::Duration::days(self.cache_stale_after_days),
            fetch_timeout: std::time::Duration::from_secs(self.upstream_timeout_secs),
            timezone: self.cache_timezone,
        }
    }

    pub fn bind_address(&self) -> std::net::SocketAddr {
        ([0, 0, 0, 0], self.port).into()
    }
}

/// Parses a boolean query flag the way browsers send it (`true`, `1`, `yes`).
pub fn parse_flag(raw: Option<&str>) -> Result<bool> {
    match raw.map(|r| r.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(value) => match value.as_str() {
            "" | "false" | "0" | "no" => Ok(false),
            "true" | "1" | "yes" => Ok(true),
            other => Err(anyhow!("flag value '{}' is not a boolean", other)),
        },
    }
}
