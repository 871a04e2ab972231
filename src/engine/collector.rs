//! Rate collector.
//!
//! Holds either a single live aggregator client or the set of local
//! estimators, and runs one collection pass over every configured
//! package and route. A failing provider produces a failed report;
//! it never aborts the pass.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::providers::{self, RateProvider};
use crate::types::{FetchReport, Package, Rate, Route};

// --- collection mode ---

/// How rates are being sourced for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionMode {
    /// A carrier aggregator API key was found; quotes are real.
    Live(String),
    /// No API key configured; quotes come from the built-in estimators.
    Demo,
}

impl CollectionMode {
    pub fn label(&self) -> String {
        match self {
            CollectionMode::Live(name) => format!("live ({})", name),
            CollectionMode::Demo => "demo (estimated)".to_string(),
        }
    }
}

impl std::fmt::Display for CollectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// --- collector ---

pub struct RateCollector {
    live: Option<Box<dyn RateProvider>>,
    estimated: Vec<Box<dyn RateProvider>>,
}

impl RateCollector {
    /// Builds a collector from config: a live client when an API key
    /// resolves, otherwise one estimator per configured carrier.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let live = providers::live_provider(config)?;
        let estimated = if live.is_some() {
            Vec::new()
        } else {
            providers::estimated_providers(config)
        };

        let collector = Self { live, estimated };
        info!(mode = %collector.mode(), "rate collector ready");
        Ok(collector)
    }

    /// Direct construction, used by tests to inject providers.
    pub fn new(live: Option<Box<dyn RateProvider>>, estimated: Vec<Box<dyn RateProvider>>) -> Self {
        Self { live, estimated }
    }

    pub fn mode(&self) -> CollectionMode {
        match &self.live {
            Some(p) => CollectionMode::Live(p.name().to_string()),
            None => CollectionMode::Demo,
        }
    }

    fn providers(&self) -> Vec<&dyn RateProvider> {
        match &self.live {
            Some(p) => vec![p.as_ref()],
            None => self.estimated.iter().map(|p| p.as_ref()).collect(),
        }
    }

    /// Runs one full collection pass: every provider quotes every
    /// package on every route. Returns one report per provider.
    pub async fn collect_all(&self, packages: &[Package], routes: &[Route]) -> Vec<FetchReport> {
        let mut reports = Vec::new();

        for provider in self.providers() {
            reports.push(self.collect_one(provider, packages, routes).await);
        }

        let total: usize = reports.iter().map(|r| r.rates.len()).sum();
        info!(
            providers = reports.len(),
            rates = total,
            "collection pass complete"
        );
        reports
    }

    async fn collect_one(
        &self,
        provider: &dyn RateProvider,
        packages: &[Package],
        routes: &[Route],
    ) -> FetchReport {
        let mut rates: Vec<Rate> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        for package in packages {
            for route in routes {
                match provider.fetch_rates(package, route).await {
                    Ok(quotes) => {
                        debug!(
                            provider = provider.name(),
                            package = %package.name,
                            route = %route.name,
                            quotes = quotes.len(),
                            "lane fetched"
                        );
                        rates.extend(quotes);
                    }
                    Err(e) => {
                        warn!(
                            provider = provider.name(),
                            package = %package.name,
                            route = %route.name,
                            error = %e,
                            "lane fetch failed"
                        );
                        errors.push(format!("{}/{}: {}", package.name, route.name, e));
                    }
                }
            }
        }

        if errors.is_empty() {
            FetchReport::ok(provider.name(), rates)
        } else if rates.is_empty() {
            FetchReport::failed(provider.name(), errors.join("; "))
        } else {
            // Partial success: keep the rates but record what failed.
            FetchReport {
                timestamp: Utc::now(),
                provider: provider.name().to_string(),
                success: true,
                rates,
                error: Some(errors.join("; ")),
            }
        }
    }
}

// --- tests ---
