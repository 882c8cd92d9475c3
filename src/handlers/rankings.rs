// src/handlers/rankings.rs
use log::{error, info};
use std::collections::HashMap;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use super::AppState;
use crate::config::parse_flag;

fn refresh_requested(query: &HashMap<String, String>) -> Result<bool, Rejection> {
    parse_flag(query.get("refresh").map(String::as_str))
        .map_err(|e| warp::reject::custom(ApiError::bad_request(e.to_string())))
}

pub async fn get_rankings(query: HashMap<String, String>, state: Arc<AppState>) -> Result<Json, Rejection> {
    let refresh = refresh_requested(&query)?;
    info!("Handling request to get rankings (refresh: {})", refresh);

    let response = state.rankings.get_rankings(refresh).await.map_err(|e| {
        error!("Failed to load rankings: {}", e);
        warp::reject::custom(ApiError::from(e))
    })?;

    Ok(warp::reply::json(&response))
}

pub async fn get_city_breakdown(
    city: String,
    query: HashMap<String, String>,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    let refresh = refresh_requested(&query)?;
    info!("Handling request to get city breakdown for {} (refresh: {})", city, refresh);

    let breakdown = state.rankings.get_city_breakdown(&city, refresh).await.map_err(|e| {
        error!("Failed to load city breakdown for {}: {}", city, e);
        warp::reject::custom(ApiError::from(e))
    })?;

    Ok(warp::reply::json(&breakdown))
}
