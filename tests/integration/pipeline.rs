//! End-to-end pipeline tests: collector → store → dashboard API.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use tempfile::TempDir;
use tower::ServiceExt;

use ratewatch::dashboard::{build_router, DashboardState};
use ratewatch::engine::{CollectionMode, RateCollector};
use ratewatch::providers::RateProvider;
use ratewatch::storage::RateStore;
use ratewatch::types::{Package, Route};

use crate::mock_provider::MockProvider;

fn test_packages() -> Vec<Package> {
    vec![
        Package {
            name: "Small".to_string(),
            length: 6.0,
            width: 4.0,
            height: 2.0,
            weight: 1.0,
        },
        Package {
            name: "Medium".to_string(),
            length: 12.0,
            width: 8.0,
            height: 6.0,
            weight: 5.0,
        },
    ]
}

fn test_routes() -> Vec<Route> {
    vec![Route {
        name: "US Domestic (NY to LA)".to_string(),
        origin_zip: "10001".to_string(),
        origin_country: "US".to_string(),
        destination_zip: "90001".to_string(),
        destination_country: "US".to_string(),
    }]
}

async fn get_json(router: axum::Router, uri: &str) -> serde_json::Value {
    let resp = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK, "GET {uri}");
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn collect_store_and_serve() {
    let dir = TempDir::new().unwrap();
    let store = RateStore::new(dir.path()).unwrap();

    let mock = MockProvider::new("Mock (estimated)");
    let collector = RateCollector::new(None, vec![Box::new(mock)]);
    assert_eq!(collector.mode(), CollectionMode::Demo);

    let packages = test_packages();
    let routes = test_routes();

    let reports = collector.collect_all(&packages, &routes).await;
    assert_eq!(reports.len(), 1);
    assert!(reports[0].success);
    // 2 packages x 1 route x 2 services
    assert_eq!(reports[0].rates.len(), 4);

    let rates: Vec<_> = reports.iter().flat_map(|r| r.rates.clone()).collect();
    let (recorded, changes) = store.save_rates(&rates).unwrap();
    assert_eq!(recorded.len(), 4);
    assert!(changes.is_empty());

    let state = Arc::new(DashboardState::new(
        collector.mode(),
        3600,
        packages,
        routes,
        store,
    ));
    state
        .record_cycle(rates, reports, Utc::now() + chrono::Duration::seconds(3600))
        .await;

    let rates_json = get_json(build_router(state.clone()), "/api/rates").await;
    assert_eq!(rates_json["count"], 4);
    assert_eq!(rates_json["carriers"], 2);

    let filtered = get_json(build_router(state.clone()), "/api/rates?carrier=USPS&package=Small").await;
    assert_eq!(filtered["count"], 1);
    assert_eq!(filtered["rates"][0]["carrier"], "USPS");
    assert_eq!(filtered["rates"][0]["package_name"], "Small");

    let status = get_json(build_router(state.clone()), "/api/status").await;
    assert_eq!(status["live"], false);
    assert_eq!(status["total_rates"], 4);
    assert_eq!(status["reports"][0]["success"], true);

    let history = get_json(build_router(state), "/api/history?days=7").await;
    assert_eq!(history.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn price_change_flows_to_changes_endpoint() {
    let dir = TempDir::new().unwrap();
    let store = RateStore::new(dir.path()).unwrap();

    let mock = MockProvider::new("Mock (estimated)");
    let price = mock.price_handle();
    let collector = RateCollector::new(None, vec![Box::new(mock)]);
    let packages = vec![test_packages().remove(0)];
    let routes = test_routes();

    // First pass records the baseline.
    let reports = collector.collect_all(&packages, &routes).await;
    let rates: Vec<_> = reports.iter().flat_map(|r| r.rates.clone()).collect();
    store.save_rates(&rates).unwrap();

    // Second pass with a higher base price triggers change detection.
    *price.lock().unwrap() = 12.5;
    let reports = collector.collect_all(&packages, &routes).await;
    let rates: Vec<_> = reports.iter().flat_map(|r| r.rates.clone()).collect();
    let (recorded, changes) = store.save_rates(&rates).unwrap();
    assert_eq!(recorded.len(), 2);
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|c| c.is_increase()));
    assert!(changes.iter().all(|c| (c.change_amount - 2.5).abs() < 1e-9));

    let state = Arc::new(DashboardState::new(
        CollectionMode::Demo,
        3600,
        packages,
        routes,
        store,
    ));
    let json = get_json(build_router(state), "/api/changes?limit=10").await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["increases"], 2);
    assert_eq!(json["decreases"], 0);
}

#[tokio::test]
async fn provider_failure_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let store = RateStore::new(dir.path()).unwrap();

    let broken = MockProvider::new("Broken (estimated)");
    broken.set_error("connection refused");
    let healthy = MockProvider::new("Mock (estimated)");

    let collector = RateCollector::new(None, vec![Box::new(broken), Box::new(healthy)]);
    let packages = vec![test_packages().remove(0)];
    let routes = test_routes();

    let reports = collector.collect_all(&packages, &routes).await;
    assert_eq!(reports.len(), 2);
    assert!(!reports[0].success);
    assert!(reports[0]
        .error
        .as_deref()
        .unwrap()
        .contains("connection refused"));
    assert!(reports[1].success);

    // Healthy provider's rates still land in the store.
    let rates: Vec<_> = reports.iter().flat_map(|r| r.rates.clone()).collect();
    let (recorded, _) = store.save_rates(&rates).unwrap();
    assert_eq!(recorded.len(), 2);

    let state = Arc::new(DashboardState::new(
        CollectionMode::Demo,
        3600,
        packages,
        routes,
        store,
    ));
    state
        .record_cycle(rates, reports, Utc::now() + chrono::Duration::seconds(3600))
        .await;

    let status = get_json(build_router(state), "/api/status").await;
    let report_summaries = status["reports"].as_array().unwrap();
    assert_eq!(report_summaries.len(), 2);
    assert_eq!(report_summaries[0]["success"], false);
    assert_eq!(report_summaries[1]["success"], true);
}

#[tokio::test]
async fn estimated_providers_quote_without_network() {
    // Demo mode end to end with the real estimators: purely local.
    let cfg = {
        let mut cfg = ratewatch::config::AppConfig::default();
        cfg.providers.shippo_api_key_env = "RATEWATCH_ITEST_NO_SHIPPO".to_string();
        cfg.providers.easypost_api_key_env = "RATEWATCH_ITEST_NO_EASYPOST".to_string();
        cfg
    };

    let collector = RateCollector::from_config(&cfg).unwrap();
    assert_eq!(collector.mode(), CollectionMode::Demo);

    let reports = collector.collect_all(&cfg.packages, &cfg.routes).await;
    // One report per estimator, each quoting every package/route lane.
    assert_eq!(reports.len(), 4);
    for report in &reports {
        assert!(report.success, "provider {} failed", report.provider);
        assert!(!report.rates.is_empty());
        for rate in &report.rates {
            assert!(rate.price > 0.0);
            assert_eq!(rate.currency, "USD");
        }
    }
}

#[tokio::test]
async fn mock_provider_is_not_live() {
    let mock = MockProvider::new("Mock");
    assert!(!mock.is_live());
    mock.set_base_price(20.0);
    let rates = mock
        .fetch_rates(&test_packages()[0], &test_routes()[0])
        .await
        .unwrap();
    assert!((rates[0].price - 21.0).abs() < 1e-9);
}
