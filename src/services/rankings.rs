// src/services/rankings.rs
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;

use crate::models::{CacheResponse, CityBreakdown, Place};
use super::cache::{object_entry, CacheError, MonthlyCache, PayloadShape};
use super::categories::{categorize, PlaceCategory};
use super::property_tax::city_slug;
use super::upstream::UpstreamSource;

pub const RANKINGS_KEY: &str = "rankings";

fn rankings_shape() -> PayloadShape {
    PayloadShape::requiring(&["rankings"]).with_items("rankings", object_entry)
}

fn breakdown_shape() -> PayloadShape {
    PayloadShape::requiring(&["places"]).with_items("places", place_entry)
}

fn place_entry(item: &Value) -> Result<(), String> {
    serde_json::from_value::<Place>(item.clone())
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Market rankings and per-city breakdowns, each cached once per month.
pub struct RankingsService {
    cache: MonthlyCache,
    rankings_source: Arc<dyn UpstreamSource>,
    breakdown_source: Arc<dyn UpstreamSource>,
    categories: Vec<PlaceCategory>,
}

impl RankingsService {
    pub fn new(
        cache: MonthlyCache,
        rankings_source: Arc<dyn UpstreamSource>,
        breakdown_source: Arc<dyn UpstreamSource>,
        categories: Vec<PlaceCategory>,
    ) -> Self {
        RankingsService {
            cache,
            rankings_source,
            breakdown_source,
            categories,
        }
    }

    pub fn current_month(&self) -> String {
        self.cache.current_month()
    }

    pub async fn get_rankings(&self, force_refresh: bool) -> Result<CacheResponse, CacheError> {
        let month = self.cache.current_month();
        self.cache
            .get_or_refresh(
                RANKINGS_KEY,
                &month,
                force_refresh,
                self.rankings_source.as_ref(),
                &rankings_shape(),
            )
            .await
    }

    pub async fn get_city_breakdown(&self, city: &str, force_refresh: bool) -> Result<CityBreakdown, CacheError> {
        let slug = city_slug(city);
        if slug == RANKINGS_KEY {
            return Err(CacheError::InvalidKey(format!("'{}' is reserved", slug)));
        }
        let month = self.cache.current_month();
        let cache = self
            .cache
            .get_or_refresh(
                &slug,
                &month,
                force_refresh,
                self.breakdown_source.as_ref(),
                &breakdown_shape(),
            )
            .await?;

        let places: Vec<Place> = match cache.payload.get("places") {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                warn!("Could not read places for {}: {}", slug, e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        let categories = categorize(&places, &self.categories);
        info!("City breakdown for {}: {} places in {} categories", slug, places.len(), categories.len());

        Ok(CityBreakdown {
            city: slug,
            cache,
            categories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MonthlyCacheRecord;
    use crate::services::cache::CachePolicy;
    use crate::services::db::{CacheStore, MemoryStore};
    use crate::BoxError;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    struct StaticFeed(Value);

    #[async_trait]
    impl UpstreamSource for StaticFeed {
        async fn fetch(&self, _cache_key: &str) -> Result<Value, BoxError> {
            Ok(self.0.clone())
        }
    }

    fn service(store: Arc<MemoryStore>, feed: Value) -> RankingsService {
        let feed: Arc<dyn UpstreamSource> = Arc::new(StaticFeed(feed));
        RankingsService::new(
            MonthlyCache::new(store, CachePolicy::default()),
            feed.clone(),
            feed,
            Vec::new(),
        )
    }

    async fn seed(store: &MemoryStore, cache_key: &str, month: &str, payload: Value) -> MonthlyCacheRecord {
        let record = MonthlyCacheRecord {
            cache_key: cache_key.to_string(),
            month: month.to_string(),
            payload,
            last_fetched_at: Utc::now(),
        };
        store.upsert_record(&record).await.unwrap();
        record
    }

    #[tokio::test]
    async fn forced_refresh_with_malformed_places_keeps_previous_record() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone(), json!({ "places": [1, 2, 3] }));
        let month = service.current_month();
        let before = seed(
            &store,
            "toronto",
            &month,
            json!({ "places": [{ "name": "Union Station", "types": ["transit_station"] }] }),
        )
        .await;

        let breakdown = service.get_city_breakdown("Toronto", true).await.unwrap();
        assert!(breakdown.cache.stale);
        assert_eq!(breakdown.cache.payload, before.payload);
        assert_eq!(store.get_record("toronto", &month).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn malformed_places_without_history_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone(), json!({ "places": [{ "types": ["park"] }] }));

        let err = service.get_city_breakdown("ottawa", false).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidPayload(_)));
        assert!(store.latest_record("ottawa").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rankings_entries_must_be_objects() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone(), json!({ "rankings": ["toronto", "ottawa"] }));

        let err = service.get_rankings(false).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidPayload(_)));
    }
}
