//! EasyPost live rate integration.
//!
//! Creates a shipment via the EasyPost REST API and reads back the
//! rates quoted across all connected carriers.
//!
//! API docs: https://docs.easypost.com/docs/shipments
//! Base URL: https://api.easypost.com/v2
//! Auth: HTTP basic, API key as username, empty password.
//! Parcel weight is in ounces.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use super::RateProvider;
use crate::config::HttpConfig;
use crate::types::{normalize_carrier, Package, Rate, Route};

const BASE_URL: &str = "https://api.easypost.com/v2";
const PROVIDER_NAME: &str = "EasyPost";

/// Pounds → ounces for the parcel weight field.
const OZ_PER_LB: f64 = 16.0;

// ---------------------------------------------------------------------------
// API response types (EasyPost JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EasyPostShipment {
    #[serde(default)]
    rates: Vec<EasyPostRate>,
}

#[derive(Debug, Deserialize)]
struct EasyPostRate {
    /// Carrier name, e.g. "USPS", "FedExSmartPost".
    carrier: String,
    service: String,
    /// Price as a decimal string, e.g. "7.33".
    rate: String,
    currency: String,
    #[serde(default)]
    delivery_days: Option<u32>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// EasyPost aggregator client.
pub struct EasyPostClient {
    http: Client,
    api_key: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl EasyPostClient {
    pub fn new(api_key: String, http_cfg: &HttpConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(http_cfg.timeout_secs))
            .user_agent("ratewatch/0.1.0 (shipping-rate-monitor)")
            .build()
            .context("Failed to build HTTP client for EasyPost")?;

        Ok(Self {
            http,
            api_key,
            max_retries: http_cfg.max_retries.max(1),
            retry_delay: Duration::from_secs(http_cfg.retry_delay_secs),
        })
    }

    fn shipment_body(package: &Package, route: &Route) -> serde_json::Value {
        let (city, state) = if route.destination_country == "US" {
            ("Los Angeles", "CA")
        } else {
            ("London", "")
        };

        json!({
            "shipment": {
                "from_address": {
                    "street1": "123 Main St",
                    "city": "New York",
                    "state": "NY",
                    "zip": route.origin_zip,
                    "country": route.origin_country,
                },
                "to_address": {
                    "street1": "456 Oak Ave",
                    "city": city,
                    "state": state,
                    "zip": route.destination_zip,
                    "country": route.destination_country,
                },
                "parcel": {
                    "length": package.length,
                    "width": package.width,
                    "height": package.height,
                    "weight": package.weight * OZ_PER_LB,
                },
            }
        })
    }

    async fn create_shipment(&self, body: &serde_json::Value) -> Result<EasyPostShipment> {
        let mut last_err = None;

        for attempt in 1..=self.max_retries {
            let result = self
                .http
                .post(format!("{BASE_URL}/shipments"))
                .basic_auth(&self.api_key, None::<&str>)
                .json(body)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<EasyPostShipment>()
                        .await
                        .context("Failed to parse EasyPost shipment response");
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!("EasyPost API error {status}: {text}"));
                }
                Err(e) => {
                    last_err = Some(anyhow::Error::new(e).context("EasyPost API request failed"));
                }
            }

            warn!(
                attempt,
                max = self.max_retries,
                "EasyPost request failed, retrying"
            );
            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay * attempt).await;
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("EasyPost request failed")))
    }

    /// Convert an EasyPost rate to the RATEWATCH `Rate` type.
    fn to_rate(api: &EasyPostRate, package: &Package, route: &Route) -> Option<Rate> {
        let price: f64 = match api.rate.parse() {
            Ok(p) => p,
            Err(_) => {
                warn!(rate = %api.rate, "Skipping EasyPost rate with unparseable amount");
                return None;
            }
        };

        Some(Rate {
            carrier: normalize_carrier(&api.carrier),
            service: api.service.clone(),
            package_name: package.name.clone(),
            origin: route.origin_zip.clone(),
            origin_country: route.origin_country.clone(),
            destination: route.destination_zip.clone(),
            destination_country: route.destination_country.clone(),
            price,
            currency: api.currency.clone(),
            delivery_days: api.delivery_days,
            quoted_at: chrono::Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// RateProvider trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl RateProvider for EasyPostClient {
    async fn fetch_rates(&self, package: &Package, route: &Route) -> Result<Vec<Rate>> {
        let body = Self::shipment_body(package, route);
        debug!(package = %package.name, route = %route.name, "Requesting EasyPost rates");

        let shipment = self.create_shipment(&body).await?;
        let rates: Vec<Rate> = shipment
            .rates
            .iter()
            .filter_map(|r| Self::to_rate(r, package, route))
            .collect();

        debug!(count = rates.len(), "EasyPost rates received");
        Ok(rates)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_live(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
