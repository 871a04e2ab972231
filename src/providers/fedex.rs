//! FedEx estimated rates.
//!
//! Table-based estimates from FedEx 2024 rate sheets, Zone 8 domestic
//! pricing. Same billable-weight model as UPS with slightly different
//! surcharges.

use anyhow::Result;
use async_trait::async_trait;

use super::{build_rate, RateProvider};
use crate::types::{Carrier, Package, Rate, Route};

struct ServiceTable {
    service: &'static str,
    base: f64,
    per_lb: f64,
    delivery_days: u32,
}

const DOMESTIC: &[ServiceTable] = &[
    ServiceTable { service: "FedEx Ground", base: 11.80, per_lb: 0.70, delivery_days: 5 },
    ServiceTable { service: "FedEx Home Delivery", base: 12.50, per_lb: 0.75, delivery_days: 5 },
    ServiceTable { service: "FedEx Express Saver", base: 22.00, per_lb: 1.80, delivery_days: 3 },
    ServiceTable { service: "FedEx 2Day", base: 30.00, per_lb: 2.20, delivery_days: 2 },
    ServiceTable { service: "FedEx 2Day AM", base: 35.00, per_lb: 2.50, delivery_days: 2 },
    ServiceTable { service: "FedEx Priority Overnight", base: 52.00, per_lb: 3.80, delivery_days: 1 },
    ServiceTable { service: "FedEx Standard Overnight", base: 48.00, per_lb: 3.50, delivery_days: 1 },
];

const INTERNATIONAL: &[ServiceTable] = &[
    ServiceTable { service: "FedEx International Priority", base: 80.00, per_lb: 7.50, delivery_days: 2 },
    ServiceTable { service: "FedEx International Economy", base: 55.00, per_lb: 5.00, delivery_days: 5 },
    ServiceTable { service: "FedEx International First", base: 95.00, per_lb: 9.00, delivery_days: 1 },
    ServiceTable { service: "FedEx International Ground", base: 40.00, per_lb: 3.50, delivery_days: 7 },
];

const DOMESTIC_SURCHARGE: f64 = 1.16;
const INTERNATIONAL_SURCHARGE: f64 = 1.22;

pub struct FedExEstimator;

impl FedExEstimator {
    fn quote(table: &[ServiceTable], surcharge: f64, package: &Package, route: &Route) -> Vec<Rate> {
        let billable = package.billable_weight();
        table
            .iter()
            .map(|t| {
                let price = (t.base + billable * t.per_lb) * surcharge;
                build_rate(Carrier::FedEx, t.service, package, route, price, Some(t.delivery_days))
            })
            .collect()
    }
}

#[async_trait]
impl RateProvider for FedExEstimator {
    async fn fetch_rates(&self, package: &Package, route: &Route) -> Result<Vec<Rate>> {
        if route.is_domestic() {
            Ok(Self::quote(DOMESTIC, DOMESTIC_SURCHARGE, package, route))
        } else {
            Ok(Self::quote(INTERNATIONAL, INTERNATIONAL_SURCHARGE, package, route))
        }
    }

    fn name(&self) -> &str {
        Carrier::FedEx.display_name()
    }

    fn is_live(&self) -> bool {
        false
    }
}
