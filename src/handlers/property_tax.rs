// src/handlers/property_tax.rs
use log::{error, info};
use std::collections::HashMap;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use super::AppState;

pub async fn get_property_tax(query: HashMap<String, String>, state: Arc<AppState>) -> Result<Json, Rejection> {
    let city = query
        .get("city")
        .ok_or_else(|| warp::reject::custom(ApiError::bad_request("missing 'city' parameter")))?;
    let assessed_value: f64 = query
        .get("assessed_value")
        .ok_or_else(|| warp::reject::custom(ApiError::bad_request("missing 'assessed_value' parameter")))?
        .parse()
        .map_err(|_| warp::reject::custom(ApiError::bad_request("'assessed_value' must be a number")))?;

    info!("Handling property tax request for {} at {}", city, assessed_value);

    let quote = state.tax_table.annual_property_tax(city, assessed_value).map_err(|e| {
        error!("Property tax lookup failed: {}", e);
        warp::reject::custom(ApiError::from(e))
    })?;

    Ok(warp::reply::json(&quote))
}
