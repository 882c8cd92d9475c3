use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use warp::http::StatusCode;

use realty_insights::handlers::AppState;
use realty_insights::routes::routes;
use realty_insights::services::amortization::CalculatorConfig;
use realty_insights::services::cache::{CachePolicy, MonthlyCache};
use realty_insights::services::categories::{CategoryRule, PlaceCategory};
use realty_insights::services::db::MemoryStore;
use realty_insights::services::property_tax::PropertyTaxTable;
use realty_insights::services::rankings::RankingsService;
use realty_insights::services::upstream::UpstreamSource;
use realty_insights::BoxError;

struct StaticSource {
    payload: Option<Value>,
    calls: AtomicUsize,
}

impl StaticSource {
    fn new(payload: Option<Value>) -> Arc<Self> {
        Arc::new(StaticSource { payload, calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl UpstreamSource for StaticSource {
    async fn fetch(&self, _cache_key: &str) -> Result<Value, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payload.clone().ok_or_else(|| "upstream unavailable".into())
    }
}

fn state(rankings: Arc<StaticSource>, breakdown: Arc<StaticSource>) -> Arc<AppState> {
    let cache = MonthlyCache::new(Arc::new(MemoryStore::new()), CachePolicy::default());
    let categories = vec![PlaceCategory {
        label: "Parks".to_string(),
        rules: vec![CategoryRule::TypeIncludes { value: "park".to_string() }],
    }];
    Arc::new(AppState {
        calculator: CalculatorConfig::default(),
        tax_table: PropertyTaxTable::from_rates([("toronto", 0.715)]),
        rankings: Arc::new(RankingsService::new(cache, rankings, breakdown, categories)),
    })
}

fn default_state() -> Arc<AppState> {
    state(
        StaticSource::new(Some(json!({ "rankings": [{ "city": "toronto", "rank": 1 }] }))),
        StaticSource::new(Some(json!({ "places": [
            { "name": "High Park", "types": ["park"] },
            { "name": "Union Station", "types": ["transit_station"] }
        ] }))),
    )
}

fn scenario() -> Value {
    json!({
        "homePrice": 500000.0,
        "downPaymentPercent": 20.0,
        "monthlyRent": 2500.0,
        "mortgageRate": 5.5,
        "amortizationYears": 25,
        "annualRentIncrease": 3.0,
        "homeAppreciation": 3.0,
        "investmentReturn": 6.0,
        "annualPropertyTax": 3000.0,
        "annualInsurance": 1500.0,
        "annualMaintenance": 3000.0,
        "closingCosts": 10000.0
    })
}

fn body<B: AsRef<[u8]>>(resp: &warp::http::Response<B>) -> Value {
    serde_json::from_slice(resp.body().as_ref()).unwrap()
}

#[tokio::test]
async fn rent_vs_buy_returns_thirty_years() {
    let api = routes(default_state());
    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/calculator/rent-vs-buy")
        .json(&scenario())
        .reply(&api)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body(&resp);
    assert_eq!(json["yearlyData"].as_array().unwrap().len(), 30);
    assert_eq!(json["breakevenYear"], json!(1));
    assert_eq!(json["yearlyData"][0]["year"], json!(1));
}

#[tokio::test]
async fn rent_vs_buy_rejects_invalid_inputs() {
    let api = routes(default_state());
    let mut inputs = scenario();
    inputs["homePrice"] = json!(-1.0);

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/calculator/rent-vs-buy")
        .json(&inputs)
        .reply(&api)
        .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body(&resp)["error"].as_str().unwrap().contains("homePrice"));
}

#[tokio::test]
async fn rent_vs_buy_rejects_malformed_body() {
    let api = routes(default_state());
    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/calculator/rent-vs-buy")
        .header("content-type", "application/json")
        .body("{\"homePrice\": \"lots\"}")
        .reply(&api)
        .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rent_vs_buy_rejects_oversized_body() {
    let api = routes(default_state());
    let padding = " ".repeat(17 * 1024);
    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/calculator/rent-vs-buy")
        .header("content-type", "application/json")
        .body(format!("{}{}", scenario(), padding))
        .reply(&api)
        .await;

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body(&resp)["error"], json!("Payload Too Large"));
}

#[tokio::test]
async fn property_tax_quotes_and_errors() {
    let api = routes(default_state());

    let resp = warp::test::request()
        .path("/api/v1/property-tax?city=Toronto&assessed_value=1000000")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let quote = body(&resp);
    assert_eq!(quote["city"], json!("toronto"));
    assert!((quote["annual_tax"].as_f64().unwrap() - 7150.0).abs() < 1e-6);

    let resp = warp::test::request()
        .path("/api/v1/property-tax?city=atlantis&assessed_value=1")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = warp::test::request()
        .path("/api/v1/property-tax?city=toronto")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rankings_are_cached_after_first_request() {
    let rankings = StaticSource::new(Some(json!({ "rankings": [{ "city": "toronto" }] })));
    let api = routes(state(rankings.clone(), StaticSource::new(None)));

    let first = warp::test::request().path("/api/v1/rankings").reply(&api).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body(&first)["cached"], json!(false));

    let second = warp::test::request().path("/api/v1/rankings").reply(&api).await;
    let second = body(&second);
    assert_eq!(second["cached"], json!(true));
    assert_eq!(second["stale"], json!(false));
    assert_eq!(rankings.calls.load(Ordering::SeqCst), 1);

    let forced = warp::test::request().path("/api/v1/rankings?refresh=true").reply(&api).await;
    assert_eq!(forced.status(), StatusCode::OK);
    assert_eq!(rankings.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rankings_without_cache_or_upstream_is_bad_gateway() {
    let api = routes(state(StaticSource::new(None), StaticSource::new(None)));
    let resp = warp::test::request().path("/api/v1/rankings").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn rankings_rejects_bad_refresh_flag() {
    let api = routes(default_state());
    let resp = warp::test::request().path("/api/v1/rankings?refresh=sometimes").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn city_breakdown_counts_categories() {
    let api = routes(default_state());
    let resp = warp::test::request().path("/api/v1/rankings/city/toronto").reply(&api).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body(&resp);
    assert_eq!(json["city"], json!("toronto"));
    assert_eq!(json["categories"]["Parks"], json!(1));
    assert_eq!(json["stale"], json!(false));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let api = routes(default_state());
    let resp = warp::test::request().path("/api/v1/nothing-here").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
