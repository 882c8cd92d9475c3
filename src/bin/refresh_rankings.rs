// src/bin/refresh_rankings.rs
use dotenv::dotenv;
use log::{error, info};
use std::env;

use realty_insights::config::AppConfig;
use realty_insights::handlers::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;
    let state = AppState::from_config(&config).await?;
    let month = state.rankings.current_month();

    info!("Forcing rankings refresh for {}...", month);
    match state.rankings.get_rankings(true).await {
        Ok(response) if response.stale => {
            error!("✗ Upstream refresh failed, kept snapshot from {} ({})", response.month, response.last_fetched_at);
        }
        Ok(response) => {
            info!("✓ Rankings for {} refreshed at {}", response.month, response.last_fetched_at);
        }
        Err(e) => {
            error!("✗ Rankings refresh failed: {}", e);
            return Err(e.into());
        }
    }

    // Extra arguments are city slugs to refresh as well.
    for city in env::args().skip(1) {
        match state.rankings.get_city_breakdown(&city, true).await {
            Ok(breakdown) => info!(
                "✓ {} breakdown (stale: {}): {:?}",
                breakdown.city, breakdown.cache.stale, breakdown.categories
            ),
            Err(e) => error!("✗ {} breakdown failed: {}", city, e),
        }
    }

    Ok(())
}
