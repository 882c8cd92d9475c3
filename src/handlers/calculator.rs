// src/handlers/calculator.rs
use log::{error, info};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use super::AppState;
use crate::models::ScenarioInputs;
use crate::services::amortization::compute_amortization;

pub async fn rent_vs_buy(inputs: ScenarioInputs, state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling rent-vs-buy calculation for home price {}", inputs.home_price);

    let result = compute_amortization(&state.calculator, &inputs).map_err(|e| {
        error!("Rejected calculator inputs: {}", e);
        warp::reject::custom(ApiError::from(e))
    })?;

    info!(
        "Monthly payment {:.2}, breakeven year {:?}",
        result.monthly_payment, result.breakeven_year
    );
    Ok(warp::reply::json(&result))
}
