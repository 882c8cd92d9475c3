// src/routes.rs
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use log::{info, warn};
use warp::filters::body::BodyDeserializeError;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::calculator::rent_vs_buy;
use crate::handlers::error::{ApiError, ErrorKind};
use crate::handlers::property_tax::get_property_tax;
use crate::handlers::rankings::{get_city_breakdown, get_rankings};
use crate::handlers::AppState;

// Scenario inputs are a dozen numbers; anything bigger is not a calculator request.
const MAX_BODY_BYTES: u64 = 16 * 1024;

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let error = if err.is_not_found() {
        ApiError::not_found("Not Found")
    } else if let Some(api_error) = err.find::<ApiError>() {
        api_error.clone()
    } else if let Some(body_error) = err.find::<BodyDeserializeError>() {
        ApiError::bad_request(format!("Invalid request body: {}", body_error))
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        ApiError::bad_request("Invalid query string")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiError::new(ErrorKind::MethodNotAllowed, "Method Not Allowed")
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        ApiError::bad_request("Content-Length header is required")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        ApiError::new(ErrorKind::PayloadTooLarge, "Payload Too Large")
    } else {
        warn!("Unhandled rejection: {:?}", err);
        ApiError::new(ErrorKind::Internal, "Internal Server Error")
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": error.message,
        })),
        error.status(),
    ))
}

pub fn routes(state: Arc<AppState>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let state_filter = warp::any().map(move || state.clone());

    let rent_vs_buy_route = warp::path!("api" / "v1" / "calculator" / "rent-vs-buy")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(rent_vs_buy);

    let property_tax_route = warp::path!("api" / "v1" / "property-tax")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(state_filter.clone())
        .and_then(get_property_tax);

    let rankings_route = warp::path!("api" / "v1" / "rankings")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(state_filter.clone())
        .and_then(get_rankings);

    let city_breakdown_route = warp::path!("api" / "v1" / "rankings" / "city" / String)
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(state_filter.clone())
        .and_then(get_city_breakdown);

    info!("All routes configured successfully.");

    rent_vs_buy_route
        .or(property_tax_route)
        .or(rankings_route)
        .or(city_breakdown_route)
        .recover(handle_rejection)
}
