// src/bin/setup_db.rs
use dotenv::dotenv;
use log::info;
use std::env;

use realty_insights::services::db::DbStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL")?;
    let db = DbStore::new(&database_url).await.map_err(|e| anyhow::anyhow!(e))?;

    db.create_schema().await.map_err(|e| anyhow::anyhow!(e))?;

    info!("monthly_cache table is ready");
    println!("Database setup complete!");
    Ok(())
}
