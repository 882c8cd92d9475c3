// src/services/cache.rs
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use log::{debug, error, info, warn};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::models::{CacheResponse, MonthlyCacheRecord};
use super::db::CacheStore;
use super::upstream::UpstreamSource;

pub const DEFAULT_STALE_AFTER_DAYS: i64 = 25;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheError {
    Upstream(String),
    Timeout(u64),
    InvalidPayload(String),
    Store(String),
    InvalidKey(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CacheError::Upstream(msg) => write!(f, "Upstream fetch failed: {}", msg),
            CacheError::Timeout(secs) => write!(f, "Upstream fetch timed out after {}s", secs),
            CacheError::InvalidPayload(msg) => write!(f, "Upstream returned an invalid payload: {}", msg),
            CacheError::Store(msg) => write!(f, "Cache store error: {}", msg),
            CacheError::InvalidKey(msg) => write!(f, "Invalid cache key: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}

fn month_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("static regex"))
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,63}$").expect("static regex"))
}

pub fn validate_month(month: &str) -> Result<(), CacheError> {
    if month_pattern().is_match(month) {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(format!("month '{}' is not YYYY-MM", month)))
    }
}

pub fn validate_cache_key(cache_key: &str) -> Result<(), CacheError> {
    if key_pattern().is_match(cache_key) {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(format!("'{}' is not a lowercase slug", cache_key)))
    }
}

/// Month key ("YYYY-MM") of `now` in the deployment timezone.
pub fn month_key(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%Y-%m").to_string()
}

/// Checks one entry of a required array.
pub type ItemCheck = fn(&Value) -> Result<(), String>;

#[derive(Debug, Clone)]
struct RequiredArray {
    name: String,
    item_check: Option<ItemCheck>,
}

/// Arrays a payload must carry (non-empty, every entry well-formed) before it
/// may replace a stored record.
#[derive(Debug, Clone)]
pub struct PayloadShape {
    required_arrays: Vec<RequiredArray>,
}

impl PayloadShape {
    pub fn requiring(arrays: &[&str]) -> Self {
        PayloadShape {
            required_arrays: arrays
                .iter()
                .map(|a| RequiredArray { name: a.to_string(), item_check: None })
                .collect(),
        }
    }

    /// Adds a per-entry check to the named array, requiring it if it was not already.
    pub fn with_items(mut self, name: &str, check: ItemCheck) -> Self {
        match self.required_arrays.iter_mut().find(|a| a.name == name) {
            Some(array) => array.item_check = Some(check),
            None => self.required_arrays.push(RequiredArray {
                name: name.to_string(),
                item_check: Some(check),
            }),
        }
        self
    }

    pub fn validate(&self, payload: &Value) -> Result<(), CacheError> {
        let object = payload
            .as_object()
            .ok_or_else(|| CacheError::InvalidPayload("payload is not a JSON object".to_string()))?;
        if object.is_empty() {
            return Err(CacheError::InvalidPayload("payload is empty".to_string()));
        }
        for array in &self.required_arrays {
            let items = match object.get(&array.name).and_then(Value::as_array) {
                Some(items) if !items.is_empty() => items,
                Some(_) => return Err(CacheError::InvalidPayload(format!("'{}' is empty", array.name))),
                None => return Err(CacheError::InvalidPayload(format!("missing '{}' array", array.name))),
            };
            if let Some(check) = array.item_check {
                for (idx, item) in items.iter().enumerate() {
                    check(item).map_err(|e| {
                        CacheError::InvalidPayload(format!("'{}'[{}]: {}", array.name, idx, e))
                    })?;
                }
            }
        }
        Ok(())
    }
}

/// Entry check for arrays whose items must be JSON objects.
pub fn object_entry(item: &Value) -> Result<(), String> {
    if item.is_object() {
        Ok(())
    } else {
        Err("expected an object".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub stale_after: Duration,
    pub fetch_timeout: std::time::Duration,
    pub timezone: Tz,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy {
            stale_after: Duration::days(DEFAULT_STALE_AFTER_DAYS),
            fetch_timeout: std::time::Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            timezone: chrono_tz::America::Toronto,
        }
    }
}

/// Cache-aside over a month-keyed store.
///
/// Concurrent refreshes of the same key and month may both reach upstream; the
/// last upsert wins.
pub struct MonthlyCache {
    store: Arc<dyn CacheStore>,
    policy: CachePolicy,
}

impl MonthlyCache {
    pub fn new(store: Arc<dyn CacheStore>, policy: CachePolicy) -> Self {
        MonthlyCache { store, policy }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn current_month(&self) -> String {
        month_key(Utc::now(), self.policy.timezone)
    }

    pub fn is_stale(&self, record: &MonthlyCacheRecord, now: DateTime<Utc>) -> bool {
        now - record.last_fetched_at > self.policy.stale_after
    }

    fn respond(&self, record: MonthlyCacheRecord, stale: bool) -> CacheResponse {
        CacheResponse {
            month: record.month,
            payload: record.payload,
            cached: true,
            stale,
            last_fetched_at: record.last_fetched_at,
        }
    }

    async fn fetch_validated(
        &self,
        cache_key: &str,
        source: &dyn UpstreamSource,
        shape: &PayloadShape,
    ) -> Result<Value, CacheError> {
        let timeout = self.policy.fetch_timeout;
        let payload = match tokio::time::timeout(timeout, source.fetch(cache_key)).await {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => return Err(CacheError::Upstream(e.to_string())),
            Err(_) => return Err(CacheError::Timeout(timeout.as_secs())),
        };
        shape.validate(&payload)?;
        Ok(payload)
    }

    pub async fn get_or_refresh(
        &self,
        cache_key: &str,
        month: &str,
        force_refresh: bool,
        source: &dyn UpstreamSource,
        shape: &PayloadShape,
    ) -> Result<CacheResponse, CacheError> {
        self.get_or_refresh_at(cache_key, month, force_refresh, source, shape, Utc::now()).await
    }

    pub async fn get_or_refresh_at(
        &self,
        cache_key: &str,
        month: &str,
        force_refresh: bool,
        source: &dyn UpstreamSource,
        shape: &PayloadShape,
        now: DateTime<Utc>,
    ) -> Result<CacheResponse, CacheError> {
        validate_cache_key(cache_key)?;
        validate_month(month)?;

        let existing = self
            .store
            .get_record(cache_key, month)
            .await
            .map_err(|e| CacheError::Store(e.to_string()))?;

        if let Some(record) = &existing {
            if !force_refresh {
                let stale = self.is_stale(record, now);
                if stale {
                    info!("Serving stale {} snapshot for {} (fetched {})", cache_key, month, record.last_fetched_at);
                } else {
                    debug!("Cache hit for {} {}", cache_key, month);
                }
                return Ok(self.respond(record.clone(), stale));
            }
        }

        info!("Fetching {} for {} (forced: {})", cache_key, month, force_refresh);
        match self.fetch_validated(cache_key, source, shape).await {
            Ok(payload) => {
                let record = MonthlyCacheRecord {
                    cache_key: cache_key.to_string(),
                    month: month.to_string(),
                    payload,
                    last_fetched_at: now,
                };
                if let Err(e) = self.store.upsert_record(&record).await {
                    // Still serve what we fetched.
                    error!("Failed to store {} snapshot for {}: {}", cache_key, month, e);
                }
                Ok(CacheResponse {
                    month: record.month,
                    payload: record.payload,
                    cached: false,
                    stale: false,
                    last_fetched_at: record.last_fetched_at,
                })
            }
            Err(e) => {
                warn!("Refresh of {} for {} failed: {}", cache_key, month, e);
                if let Some(record) = existing {
                    return Ok(self.respond(record, true));
                }
                match self.store.latest_record(cache_key).await {
                    Ok(Some(previous)) => {
                        warn!("Falling back to {} snapshot from {}", cache_key, previous.month);
                        Ok(self.respond(previous, true))
                    }
                    Ok(None) => Err(e),
                    Err(store_err) => {
                        error!("Failed to look up previous {} snapshot: {}", cache_key, store_err);
                        Err(e)
                    }
                }
            }
        }
    }
}
