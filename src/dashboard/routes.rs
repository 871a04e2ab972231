//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tracing::error;

use crate::engine::CollectionMode;
use crate::storage::RateStore;
use crate::types::{FetchReport, Package, Rate, RateChange, Route};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub mode: CollectionMode,
    pub poll_interval_secs: u64,
    pub packages: Vec<Package>,
    pub routes: Vec<Route>,
    pub store: RateStore,
    pub current_rates: RwLock<Vec<Rate>>,
    pub reports: RwLock<Vec<FetchReport>>,
    pub last_run: RwLock<Option<DateTime<Utc>>>,
    pub next_run: RwLock<Option<DateTime<Utc>>>,
    /// Signalled by POST /api/refresh to trigger an immediate cycle.
    pub refresh: Notify,
}

impl DashboardState {
    pub fn new(
        mode: CollectionMode,
        poll_interval_secs: u64,
        packages: Vec<Package>,
        routes: Vec<Route>,
        store: RateStore,
    ) -> Self {
        Self {
            mode,
            poll_interval_secs,
            packages,
            routes,
            store,
            current_rates: RwLock::new(Vec::new()),
            reports: RwLock::new(Vec::new()),
            last_run: RwLock::new(None),
            next_run: RwLock::new(None),
            refresh: Notify::new(),
        }
    }

    /// Called by the main loop after each collection cycle.
    pub async fn record_cycle(&self, rates: Vec<Rate>, reports: Vec<FetchReport>, next: DateTime<Utc>) {
        *self.current_rates.write().await = rates;
        *self.reports.write().await = reports;
        *self.last_run.write().await = Some(Utc::now());
        *self.next_run.write().await = Some(next);
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RatesResponse {
    pub count: usize,
    pub carriers: usize,
    pub avg_price: Option<f64>,
    pub min_price: Option<f64>,
    pub rates: Vec<Rate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub carrier: String,
    pub service: String,
    pub package: String,
    pub route: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangesResponse {
    pub total: usize,
    pub increases: usize,
    pub decreases: usize,
    pub changes: Vec<RateChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub mode: String,
    pub live: bool,
    pub provider: Option<String>,
    pub interval_seconds: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub reports: Vec<ReportSummary>,
    pub total_rates: usize,
    pub tracked_carriers: Vec<String>,
    pub packages: Vec<Package>,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub provider: String,
    pub success: bool,
    pub rates: usize,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub triggered: bool,
}

// ---------------------------------------------------------------------------
// Query params
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct RatesQuery {
    pub carrier: Option<String>,
    pub package: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_days")]
    pub days: i64,
    pub carrier: Option<String>,
    pub package: Option<String>,
}

fn default_history_days() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    #[serde(default = "default_changes_limit")]
    pub limit: usize,
}

fn default_changes_limit() -> usize {
    50
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/rates
pub async fn get_rates(
    State(state): State<AppState>,
    Query(query): Query<RatesQuery>,
) -> Json<RatesResponse> {
    let current = state.current_rates.read().await;

    let rates: Vec<Rate> = current
        .iter()
        .filter(|r| match &query.carrier {
            Some(c) => r.carrier.eq_ignore_ascii_case(c),
            None => true,
        })
        .filter(|r| match &query.package {
            Some(p) => r.package_name.eq_ignore_ascii_case(p),
            None => true,
        })
        .cloned()
        .collect();

    let carriers = rates
        .iter()
        .map(|r| r.carrier.as_str())
        .collect::<std::collections::HashSet<_>>()
        .len();
    let avg_price = if rates.is_empty() {
        None
    } else {
        Some(rates.iter().map(|r| r.price).sum::<f64>() / rates.len() as f64)
    };
    let min_price = rates.iter().map(|r| r.price).fold(None, |acc: Option<f64>, p| {
        Some(acc.map_or(p, |m| m.min(p)))
    });

    Json(RatesResponse {
        count: rates.len(),
        carriers,
        avg_price,
        min_price,
        rates,
    })
}

/// GET /api/history
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryPoint>>, StatusCode> {
    let days = query.days.clamp(1, 365);
    let entries = state.store.historical_entries(days).map_err(|e| {
        error!(error = %e, "failed to load historical entries");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let mut points = Vec::new();
    for entry in entries {
        for rate in entry.rates {
            if let Some(c) = &query.carrier {
                if !rate.carrier.eq_ignore_ascii_case(c) {
                    continue;
                }
            }
            if let Some(p) = &query.package {
                if !rate.package_name.eq_ignore_ascii_case(p) {
                    continue;
                }
            }
            points.push(HistoryPoint {
                timestamp: entry.timestamp,
                route: format!("{} -> {}", rate.origin, rate.destination),
                carrier: rate.carrier,
                service: rate.service,
                package: rate.package_name,
                price: rate.price,
            });
        }
    }

    Ok(Json(points))
}

/// GET /api/changes
pub async fn get_changes(
    State(state): State<AppState>,
    Query(query): Query<ChangesQuery>,
) -> Result<Json<ChangesResponse>, StatusCode> {
    let changes = state.store.recent_changes(query.limit).map_err(|e| {
        error!(error = %e, "failed to load changes");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let increases = changes.iter().filter(|c| c.is_increase()).count();
    let decreases = changes.len() - increases;

    Ok(Json(ChangesResponse {
        total: changes.len(),
        increases,
        decreases,
        changes,
    }))
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    let store_status = state.store.status().map_err(|e| {
        error!(error = %e, "failed to load store status");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let reports = state.reports.read().await;
    let summaries: Vec<ReportSummary> = reports
        .iter()
        .map(|r| ReportSummary {
            provider: r.provider.clone(),
            success: r.success,
            rates: r.rates.len(),
            error: r.error.clone(),
            timestamp: r.timestamp,
        })
        .collect();

    let (live, provider) = match &state.mode {
        CollectionMode::Live(name) => (true, Some(name.clone())),
        CollectionMode::Demo => (false, None),
    };

    Ok(Json(StatusResponse {
        mode: state.mode.label(),
        live,
        provider,
        interval_seconds: state.poll_interval_secs,
        last_run: *state.last_run.read().await,
        next_run: *state.next_run.read().await,
        reports: summaries,
        total_rates: store_status.total_rates,
        tracked_carriers: store_status.carriers,
        packages: state.packages.clone(),
        routes: state.routes.clone(),
    }))
}

/// POST /api/refresh
pub async fn post_refresh(State(state): State<AppState>) -> (StatusCode, Json<RefreshResponse>) {
    state.refresh.notify_one();
    (StatusCode::ACCEPTED, Json(RefreshResponse { triggered: true }))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
