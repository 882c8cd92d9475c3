use dotenv::dotenv;
use log::{error, info};
use std::sync::Arc;
use warp::Filter;

use realty_insights::config::AppConfig;
use realty_insights::handlers::AppState;
use realty_insights::routes;
use realty_insights::services::scheduler::start_monthly_warmup;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let config = AppConfig::from_env()?;
    let addr = config.bind_address();
    info!("Will bind to: {}", addr);

    let state = Arc::new(AppState::from_config(&config).await?);

    // Keep the scheduler alive for the lifetime of the server.
    let _scheduler = match start_monthly_warmup(state.rankings.clone()).await {
        Ok(scheduler) => Some(scheduler),
        Err(e) => {
            error!("Failed to schedule monthly warm-up, continuing without it: {}", e);
            None
        }
    };

    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST"]);

    let api = routes::routes(state).with(cors);
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
