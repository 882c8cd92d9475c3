// src/services/db.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::MonthlyCacheRecord;
use crate::BoxError;

/// Persistence for month-keyed snapshots. Writes replace the whole row.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_record(&self, cache_key: &str, month: &str) -> Result<Option<MonthlyCacheRecord>, BoxError>;

    /// Most recent record for the key across all months.
    async fn latest_record(&self, cache_key: &str) -> Result<Option<MonthlyCacheRecord>, BoxError>;

    async fn upsert_record(&self, record: &MonthlyCacheRecord) -> Result<(), BoxError>;
}

pub struct DbStore {
    pub(crate) pool: PgPool,
}

impl DbStore {
    pub async fn new(database_url: &str) -> Result<Self, BoxError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn create_schema(&self) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS monthly_cache (
                cache_key TEXT NOT NULL,
                month TEXT NOT NULL,
                payload JSONB NOT NULL,
                last_fetched_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (cache_key, month)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn record_from_row(row: PgRow) -> Result<MonthlyCacheRecord, BoxError> {
    let payload: Json<Value> = row.try_get("payload")?;
    let last_fetched_at: DateTime<Utc> = row.try_get("last_fetched_at")?;
    Ok(MonthlyCacheRecord {
        cache_key: row.try_get("cache_key")?,
        month: row.try_get("month")?,
        payload: payload.0,
        last_fetched_at,
    })
}

#[async_trait]
impl CacheStore for DbStore {
    async fn get_record(&self, cache_key: &str, month: &str) -> Result<Option<MonthlyCacheRecord>, BoxError> {
        let row = sqlx::query(
            r#"
            SELECT cache_key, month, payload, last_fetched_at
            FROM monthly_cache
            WHERE cache_key = $1 AND month = $2
            "#,
        )
        .bind(cache_key)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    async fn latest_record(&self, cache_key: &str) -> Result<Option<MonthlyCacheRecord>, BoxError> {
        let row = sqlx::query(
            r#"
            SELECT cache_key, month, payload, last_fetched_at
            FROM monthly_cache
            WHERE cache_key = $1
            ORDER BY month DESC
            LIMIT 1
            "#,
        )
        .bind(cache_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    async fn upsert_record(&self, record: &MonthlyCacheRecord) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT INTO monthly_cache (cache_key, month, payload, last_fetched_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cache_key, month) DO UPDATE SET
                payload = EXCLUDED.payload,
                last_fetched_at = EXCLUDED.last_fetched_at
            "#,
        )
        .bind(&record.cache_key)
        .bind(&record.month)
        .bind(Json(&record.payload))
        .bind(record.last_fetched_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(String, String), MonthlyCacheRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get_record(&self, cache_key: &str, month: &str) -> Result<Option<MonthlyCacheRecord>, BoxError> {
        let records = self.records.read().await;
        Ok(records.get(&(cache_key.to_string(), month.to_string())).cloned())
    }

    async fn latest_record(&self, cache_key: &str) -> Result<Option<MonthlyCacheRecord>, BoxError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.cache_key == cache_key)
            .max_by(|a, b| a.month.cmp(&b.month))
            .cloned())
    }

    async fn upsert_record(&self, record: &MonthlyCacheRecord) -> Result<(), BoxError> {
        let mut records = self.records.write().await;
        records.insert((record.cache_key.clone(), record.month.clone()), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(month: &str, value: i64) -> MonthlyCacheRecord {
        MonthlyCacheRecord {
            cache_key: "rankings".to_string(),
            month: month.to_string(),
            payload: json!({ "value": value }),
            last_fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn memory_store_upsert_replaces_row() {
        let store = MemoryStore::new();
        store.upsert_record(&record("2026-09", 1)).await.unwrap();
        store.upsert_record(&record("2026-09", 2)).await.unwrap();

        let got = store.get_record("rankings", "2026-09").await.unwrap().unwrap();
        assert_eq!(got.payload, json!({ "value": 2 }));
        assert!(store.get_record("rankings", "2026-10").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_store_latest_picks_newest_month() {
        let store = MemoryStore::new();
        store.upsert_record(&record("2026-08", 8)).await.unwrap();
        store.upsert_record(&record("2026-09", 9)).await.unwrap();

        let latest = store.latest_record("rankings").await.unwrap().unwrap();
        assert_eq!(latest.month, "2026-09");
        assert!(store.latest_record("toronto").await.unwrap().is_none());
    }
}
