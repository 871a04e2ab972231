//! Rate providers.
//!
//! Defines the `RateProvider` trait and provides implementations for:
//! - USPS / UPS / FedEx / DHL Express — estimated rate tables (demo mode)
//! - Shippo — live aggregator rates (requires `SHIPPO_API_KEY`)
//! - EasyPost — live aggregator rates (requires `EASYPOST_API_KEY`)
//!
//! Estimated providers are pure computation: no network I/O at all, so
//! demo mode never touches the wire.

pub mod usps;
pub mod ups;
pub mod fedex;
pub mod dhl;
pub mod shippo;
pub mod easypost;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::config::AppConfig;
use crate::types::{Carrier, Package, Rate, Route};

/// Abstraction over shipping rate sources.
///
/// Implementors quote rates for one package on one route. Estimated
/// providers compute locally; live providers call an aggregator API.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Quote rates for a package on a route. Returns one rate per
    /// service level offered for that lane; empty when the provider
    /// doesn't serve the lane at all.
    async fn fetch_rates(&self, package: &Package, route: &Route) -> Result<Vec<Rate>>;

    /// Provider name for logging and fetch reports.
    fn name(&self) -> &str;

    /// Whether this provider returns real-time carrier rates.
    fn is_live(&self) -> bool;
}

/// Select the live provider from the environment, if any key is set.
///
/// EasyPost wins when both keys are configured. Returns None when
/// neither env var holds a key — the caller falls back to demo mode.
pub fn live_provider(cfg: &AppConfig) -> Result<Option<Box<dyn RateProvider>>> {
    if let Some(key) = AppConfig::resolve_key(&cfg.providers.easypost_api_key_env) {
        let client = easypost::EasyPostClient::new(key, &cfg.http)?;
        return Ok(Some(Box::new(client)));
    }
    if let Some(key) = AppConfig::resolve_key(&cfg.providers.shippo_api_key_env) {
        let client = shippo::ShippoClient::new(key, &cfg.http)?;
        return Ok(Some(Box::new(client)));
    }
    Ok(None)
}

/// Instantiate the estimated providers named in the config.
/// Unknown carrier names are skipped with a warning.
pub fn estimated_providers(cfg: &AppConfig) -> Vec<Box<dyn RateProvider>> {
    cfg.providers
        .carriers
        .iter()
        .filter_map(|name| match name.parse::<Carrier>() {
            Ok(Carrier::Usps) => Some(Box::new(usps::UspsEstimator) as Box<dyn RateProvider>),
            Ok(Carrier::Ups) => Some(Box::new(ups::UpsEstimator) as Box<dyn RateProvider>),
            Ok(Carrier::FedEx) => Some(Box::new(fedex::FedExEstimator) as Box<dyn RateProvider>),
            Ok(Carrier::Dhl) => Some(Box::new(dhl::DhlEstimator) as Box<dyn RateProvider>),
            Err(e) => {
                tracing::warn!(carrier = %name, error = %e, "Skipping unknown carrier in config");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Shared helpers for estimated providers
// ---------------------------------------------------------------------------

/// Round a price to whole cents.
pub(crate) fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// Build a `Rate` for an estimated quote.
pub(crate) fn build_rate(
    carrier: Carrier,
    service: &str,
    package: &Package,
    route: &Route,
    price: f64,
    delivery_days: Option<u32>,
) -> Rate {
    Rate {
        carrier: carrier.display_name().to_string(),
        service: service.to_string(),
        package_name: package.name.clone(),
        origin: route.origin_zip.clone(),
        origin_country: route.origin_country.clone(),
        destination: route.destination_zip.clone(),
        destination_country: route.destination_country.clone(),
        price: round_cents(price),
        currency: "USD".to_string(),
        delivery_days,
        quoted_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
