//! RATEWATCH — Shipping Rate Monitor
//!
//! Entry point. Loads configuration, initialises structured logging,
//! selects live vs estimated providers, starts the dashboard server,
//! and runs the periodic collect→save→publish loop with graceful
//! shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info};

use ratewatch::config::AppConfig;
use ratewatch::dashboard::{self, DashboardState};
use ratewatch::engine::{CollectionMode, RateCollector};
use ratewatch::storage::RateStore;
use ratewatch::types::{Package, Rate, Route};

const BANNER: &str = r#"
 ____      _  _____ _______        ___  _____ ____ _   _
|  _ \    / \|_   _| ____\ \      / / \|_   _/ ___| | | |
| |_) |  / _ \ | | |  _|  \ \ /\ / / _ \ | || |   | |_| |
|  _ <  / ___ \| | | |___  \ V  V / ___ \| || |___|  _  |
|_| \_\/_/   \_\_| |_____|  \_/\_/_/   \_\_| \____|_| |_|

  Shipping Rate Monitor
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        poll_interval_secs = cfg.monitor.poll_interval_secs,
        packages = cfg.packages.len(),
        routes = cfg.routes.len(),
        data_dir = %cfg.storage.data_dir,
        "RATEWATCH starting up"
    );

    // -- Initialise components -------------------------------------------

    let collector = RateCollector::from_config(&cfg)?;
    let mode = collector.mode();
    match &mode {
        CollectionMode::Live(provider) => {
            info!(provider = %provider, "Live rates active");
        }
        CollectionMode::Demo => {
            info!("Demo mode: estimated rates. Set SHIPPO_API_KEY or EASYPOST_API_KEY for live rates");
        }
    }

    let store = RateStore::new(&cfg.storage.data_dir)?;

    let state = Arc::new(DashboardState::new(
        mode,
        cfg.monitor.poll_interval_secs,
        cfg.packages.clone(),
        cfg.routes.clone(),
        store,
    ));

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(state.clone(), cfg.dashboard.port)?;
    }

    // -- Main loop -------------------------------------------------------

    let poll_interval = Duration::from_secs(cfg.monitor.poll_interval_secs);
    let mut interval = tokio::time::interval(poll_interval);
    if !cfg.monitor.run_on_start {
        // Burn the interval's immediate first tick.
        interval.tick().await;
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.monitor.poll_interval_secs,
        "Entering main loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_cycle(&collector, &state, &cfg.packages, &cfg.routes, poll_interval).await;
            }
            _ = state.refresh.notified() => {
                info!("Manual refresh requested");
                run_cycle(&collector, &state, &cfg.packages, &cfg.routes, poll_interval).await;
                interval.reset();
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("RATEWATCH shut down cleanly.");
    Ok(())
}

/// Run a single collect→save→publish cycle. Failures log and the loop
/// continues on the next tick.
async fn run_cycle(
    collector: &RateCollector,
    state: &Arc<DashboardState>,
    packages: &[Package],
    routes: &[Route],
    poll_interval: Duration,
) {
    let reports = collector.collect_all(packages, routes).await;

    let rates: Vec<Rate> = reports.iter().flat_map(|r| r.rates.clone()).collect();
    let failed = reports.iter().filter(|r| !r.success).count();

    match state.store.save_rates(&rates) {
        Ok((recorded, changes)) => {
            info!(
                fetched = rates.len(),
                recorded = recorded.len(),
                changes = changes.len(),
                failed_providers = failed,
                mode = %state.mode.label(),
                "Cycle complete"
            );
            for change in &changes {
                info!(change = %change, "Rate change detected");
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to save rates — continuing to next cycle");
        }
    }

    let next = Utc::now()
        + chrono::Duration::from_std(poll_interval).unwrap_or_else(|_| chrono::Duration::zero());
    state.record_cycle(rates, reports, next).await;
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ratewatch=info"));

    let json_logging = std::env::var("RATEWATCH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
