// src/handlers/mod.rs
pub mod calculator;
pub mod error;
pub mod property_tax;
pub mod rankings;

use log::info;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::amortization::CalculatorConfig;
use crate::services::cache::MonthlyCache;
use crate::services::categories::load_categories;
use crate::services::db::{CacheStore, DbStore, MemoryStore};
use crate::services::property_tax::PropertyTaxTable;
use crate::services::rankings::RankingsService;
use crate::services::upstream::HttpSource;

/// Shared, read-only application state handed to every handler.
pub struct AppState {
    pub calculator: CalculatorConfig,
    pub tax_table: PropertyTaxTable,
    pub rankings: Arc<RankingsService>,
}

impl AppState {
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn CacheStore> = match &config.database_url {
            Some(url) => {
                let db = DbStore::new(url).await.map_err(|e| anyhow::anyhow!(e))?;
                info!("Connected to database");
                Arc::new(db)
            }
            None => Arc::new(MemoryStore::new()),
        };

        let rankings_source = HttpSource::new(config.rankings_source_url.clone()).map_err(|e| anyhow::anyhow!(e))?;
        let breakdown_source =
            HttpSource::new(config.city_breakdown_source_url.clone()).map_err(|e| anyhow::anyhow!(e))?;

        let rankings = RankingsService::new(
            MonthlyCache::new(store, config.cache_policy()),
            Arc::new(rankings_source),
            Arc::new(breakdown_source),
            load_categories(&config.place_categories_json)?,
        );

        Ok(AppState {
            calculator: CalculatorConfig::load(&config.calculator_config_json)?,
            tax_table: PropertyTaxTable::load(&config.property_tax_rates_csv)?,
            rankings: Arc::new(rankings),
        })
    }
}
