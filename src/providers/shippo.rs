//! Shippo live rate integration.
//!
//! Creates a shipment via the Shippo REST API and reads back the rates
//! quoted across all connected carriers.
//!
//! API docs: https://docs.goshippo.com/docs/api
//! Base URL: https://api.goshippo.com
//! Auth: `Authorization: ShippoToken <key>`

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

const BASE_URL: &str = "https://api.goshippo.com";
const PROVIDER_NAME: &str = "Shippo";

// ---------------------------------------------------------------------------
// API response types (Shippo JSON → Rust)
// ---------------------------------------------------------------------------

/// Shipment object returned by `POST /shipments`. Only the fields we
/// need are deserialized.
#[derive(Debug, Deserialize)]
struct ShippoShipment {
    #[serde(default)]
    rates: Vec<ShippoRate>,
}

#[derive(Debug, Deserialize)]
struct ShippoRate {
    /// Carrier token, e.g. "usps", "fedex", "dhl_express".
    provider: String,
    #[serde(default)]
    servicelevel: Option<ShippoServiceLevel>,
    /// Price as a decimal string, e.g. "12.34".
    amount: String,
    currency: String,
    #[serde(default)]
    estimated_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ShippoServiceLevel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

impl ShippoRate {
    fn service_name(&self) -> String {
        self.servicelevel
            .as_ref()
            .and_then(|s| s.name.clone().or_else(|| s.token.clone()))
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Shippo aggregator client.
pub struct ShippoClient {
    http: Client,
    api_key: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl ShippoClient {
    pub fn new(api_key: String, http_cfg: &HttpConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(http_cfg.timeout_secs))
            .user_agent("ratewatch/0.1.0 (shipping-rate-monitor)")
            .build()
            .context("Failed to build HTTP client for Shippo")?;

        Ok(Self {
            http,
            api_key,
            max_retries: http_cfg.max_retries.max(1),
            retry_delay: Duration::from_secs(http_cfg.retry_delay_secs),
        })
    }

    /// The shipment request body for a package on a route. Street-level
    /// fields are placeholders — rate quoting only keys off zip/country.
    fn shipment_body(package: &Package, route: &Route) -> serde_json::Value {
        let address_to = if route.destination_country == "US" {
            json!({
                "street1": "456 Oak Ave",
                "city": "Los Angeles",
                "state": "CA",
                "zip": route.destination_zip,
                "country": route.destination_country,
            })
        } else {
            json!({
                "street1": "10 Downing St",
                "city": "London",
                "zip": route.destination_zip,
                "country": route.destination_country,
            })
        };

        json!({
            "address_from": {
                "street1": "123 Main St",
                "city": "New York",
                "state": "NY",
                "zip": route.origin_zip,
                "country": route.origin_country,
            },
            "address_to": address_to,
            "parcels": [{
                "length": package.length.to_string(),
                "width": package.width.to_string(),
                "height": package.height.to_string(),
                "distance_unit": "in",
                "weight": package.weight.to_string(),
                "mass_unit": "lb",
            }],
            "async": false,
        })
    }

    async fn create_shipment(&self, body: &serde_json::Value) -> Result<ShippoShipment> {
        let mut last_err = None;

        for attempt in 1..=self.max_retries {
            let result = self
                .http
                .post(format!("{BASE_URL}/shipments"))
                .header("Authorization", format!("ShippoToken {}", self.api_key))
                .json(body)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<ShippoShipment>()
                        .await
                        .context("Failed to parse Shippo shipment response");
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!("Shippo API error {status}: {text}"));
                }
                Err(e) => {
                    last_err = Some(anyhow::Error::new(e).context("Shippo API request failed"));
                }
            }

            warn!(
                attempt,
                max = self.max_retries,
                "Shippo request failed, retrying"
            );
            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay * attempt).await;
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Shippo request failed")))
    }

    /// Convert a Shippo rate to the RATEWATCH `Rate` type.
    fn to_rate(api: &ShippoRate, package: &Package, route: &Route) -> Option<Rate> {
        let price: f64 = match api.amount.parse() {
            Ok(p) => p,
            Err(_) => {
                warn!(amount = %api.amount, "Skipping Shippo rate with unparseable amount");
                return None;
            }
        };

        Some(Rate {
            carrier: normalize_carrier(&api.provider),
            service: api.service_name(),
            package_name: package.name.clone(),
            origin: route.origin_zip.clone(),
            origin_country: route.origin_country.clone(),
            destination: route.destination_zip.clone(),
            destination_country: route.destination_country.clone(),
            price,
            currency: api.currency.clone(),
            delivery_days: api.estimated_days,
            quoted_at: chrono::Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// RateProvider trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl RateProvider for ShippoClient {
    async fn fetch_rates(&self, package: &Package, route: &Route) -> Result<Vec<Rate>> {
        let body = Self::shipment_body(package, route);
        debug!(package = %package.name, route = %route.name, "Requesting Shippo rates");

        let shipment = self.create_shipment(&body).await?;
        let rates: Vec<Rate> = shipment
            .rates
            .iter()
            .filter_map(|r| Self::to_rate(r, package, route))
            .collect();

        debug!(count = rates.len(), "Shippo rates received");
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

#[cfg(test)]
mod tests {
    use super::*;

    fn test_package() -> Package {
        Package {
            name: "Small".to_string(),
            length: 6.0,
            width: 4.0,
            height: 2.0,
            weight: 1.0,
        }
    }

    fn test_route() -> Route {
        Route {
            name: "NY to LA".to_string(),
            origin_zip: "10001".to_string(),
            origin_country: "US".to_string(),
            destination_zip: "90001".to_string(),
            destination_country: "US".to_string(),
        }
    }

    #[test]
    fn test_shipment_body_domestic() {
        let body = ShippoClient::shipment_body(&test_package(), &test_route());
        assert_eq!(body["address_from"]["zip"], "10001");
        assert_eq!(body["address_to"]["zip"], "90001");
        assert_eq!(body["address_to"]["country"], "US");
        assert_eq!(body["parcels"][0]["mass_unit"], "lb");
        assert_eq!(body["parcels"][0]["weight"], "1");
        assert_eq!(body["async"], false);
    }

    #[test]
    fn test_shipment_body_international() {
        let mut route = test_route();
        route.destination_zip = "SW1A 1AA".to_string();
        route.destination_country = "GB".to_string();
        let body = ShippoClient::shipment_body(&test_package(), &route);
        assert_eq!(body["address_to"]["country"], "GB");
        assert_eq!(body["address_to"]["city"], "London");
    }

    #[test]
    fn test_parse_shipment_response() {
        let json = r#"{
            "object_id": "abc",
            "status": "SUCCESS",
            "rates": [
                {
                    "provider": "usps",
                    "servicelevel": {"name": "Priority Mail", "token": "usps_priority"},
                    "amount": "10.20",
                    "currency": "USD",
                    "estimated_days": 2
                },
                {
                    "provider": "dhl_express",
                    "servicelevel": {"name": null, "token": "dhl_express_worldwide"},
                    "amount": "72.50",
                    "currency": "USD",
                    "estimated_days": null
                }
            ]
        }"#;
        let shipment: ShippoShipment = serde_json::from_str(json).unwrap();
        assert_eq!(shipment.rates.len(), 2);
        assert_eq!(shipment.rates[0].service_name(), "Priority Mail");
        assert_eq!(shipment.rates[1].service_name(), "dhl_express_worldwide");
    }

    #[test]
    fn test_to_rate_normalizes_carrier() {
        let api = ShippoRate {
            provider: "dhl_express".to_string(),
            servicelevel: Some(ShippoServiceLevel {
                name: Some("Express Worldwide".to_string()),
                token: None,
            }),
            amount: "72.50".to_string(),
            currency: "USD".to_string(),
            estimated_days: Some(3),
        };
        let rate = ShippoClient::to_rate(&api, &test_package(), &test_route()).unwrap();
        assert_eq!(rate.carrier, "DHL Express");
        assert_eq!(rate.service, "Express Worldwide");
        assert!((rate.price - 72.50).abs() < 1e-10);
        assert_eq!(rate.delivery_days, Some(3));
    }

    #[test]
    fn test_to_rate_bad_amount_skipped() {
        let api = ShippoRate {
            provider: "usps".to_string(),
            servicelevel: None,
            amount: "not-a-number".to_string(),
            currency: "USD".to_string(),
            estimated_days: None,
        };
        assert!(ShippoClient::to_rate(&api, &test_package(), &test_route()).is_none());
    }

    #[test]
    fn test_client_identity() {
        let client = ShippoClient::new("shippo_test_key".to_string(), &HttpConfig::default()).unwrap();
        assert_eq!(client.name(), "Shippo");
        assert!(client.is_live());
    }
}
