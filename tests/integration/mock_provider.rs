//! Mock rate provider for integration testing.
//!
//! Returns a fixed price per carrier/service, adjustable from test
//! code to drive change detection — all in-memory with no external
//! dependencies.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use ratewatch::providers::RateProvider;
use ratewatch::types::{Package, Rate, Route};

/// A deterministic provider whose quotes are fully controllable.
pub struct MockProvider {
    name: String,
    services: Vec<(String, String)>,
    base_price: Arc<Mutex<f64>>,
    /// If set, all fetches return this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            services: vec![
                ("USPS".to_string(), "Priority Mail".to_string()),
                ("UPS".to_string(), "UPS Ground".to_string()),
            ],
            base_price: Arc::new(Mutex::new(10.0)),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Shift every quoted price by a fixed amount.
    pub fn set_base_price(&self, price: f64) {
        *self.base_price.lock().unwrap() = price;
    }

    /// Force all subsequent fetches to return an error.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Handle for adjusting prices after the provider is boxed.
    pub fn price_handle(&self) -> Arc<Mutex<f64>> {
        self.base_price.clone()
    }
}

#[async_trait]
impl RateProvider for MockProvider {
    async fn fetch_rates(&self, package: &Package, route: &Route) -> Result<Vec<Rate>> {
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!("{msg}"));
        }

        let base = *self.base_price.lock().unwrap();
        let rates = self
            .services
            .iter()
            .enumerate()
            .map(|(i, (carrier, service))| Rate {
                carrier: carrier.clone(),
                service: service.clone(),
                package_name: package.name.clone(),
                origin: route.origin_zip.clone(),
                origin_country: route.origin_country.clone(),
                destination: route.destination_zip.clone(),
                destination_country: route.destination_country.clone(),
                price: base + (i as f64) * 5.0 + package.weight,
                currency: "USD".to_string(),
                delivery_days: Some(3),
                quoted_at: Utc::now(),
            })
            .collect();

        Ok(rates)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_live(&self) -> bool {
        false
    }
}
