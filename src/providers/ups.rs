//! UPS estimated rates.
//!
//! Table-based estimates from UPS 2024 published rate sheets, Zone 8
//! pricing for domestic (coast to coast) and Western Europe pricing
//! for international. Billable weight uses the dimensional divisor.

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
    ServiceTable { service: "UPS Ground", base: 12.50, per_lb: 0.75, delivery_days: 5 },
    ServiceTable { service: "UPS 3 Day Select", base: 18.00, per_lb: 1.20, delivery_days: 3 },
    ServiceTable { service: "UPS 2nd Day Air", base: 28.00, per_lb: 2.00, delivery_days: 2 },
    ServiceTable { service: "UPS Next Day Air Saver", base: 45.00, per_lb: 3.50, delivery_days: 1 },
    ServiceTable { service: "UPS Next Day Air", base: 55.00, per_lb: 4.00, delivery_days: 1 },
];

const INTERNATIONAL: &[ServiceTable] = &[
    ServiceTable { service: "UPS Worldwide Express", base: 85.00, per_lb: 8.00, delivery_days: 2 },
    ServiceTable { service: "UPS Worldwide Expedited", base: 65.00, per_lb: 6.00, delivery_days: 4 },
    ServiceTable { service: "UPS Worldwide Saver", base: 75.00, per_lb: 7.00, delivery_days: 3 },
    ServiceTable { service: "UPS Standard (International)", base: 45.00, per_lb: 4.00, delivery_days: 7 },
];

/// Typical fuel surcharge on domestic lanes.
const DOMESTIC_SURCHARGE: f64 = 1.15;
/// Fuel surcharge plus international fees.
const INTERNATIONAL_SURCHARGE: f64 = 1.20;

pub struct UpsEstimator;

impl UpsEstimator {
    fn quote(table: &[ServiceTable], surcharge: f64, package: &Package, route: &Route) -> Vec<Rate> {
        let billable = package.billable_weight();
        table
            .iter()
            .map(|t| {
                let price = (t.base + billable * t.per_lb) * surcharge;
                build_rate(Carrier::Ups, t.service, package, route, price, Some(t.delivery_days))
            })
            .collect()
    }
}

#[async_trait]
impl RateProvider for UpsEstimator {
    async fn fetch_rates(&self, package: &Package, route: &Route) -> Result<Vec<Rate>> {
        if route.is_domestic() {
            Ok(Self::quote(DOMESTIC, DOMESTIC_SURCHARGE, package, route))
        } else {
            Ok(Self::quote(INTERNATIONAL, INTERNATIONAL_SURCHARGE, package, route))
        }
    }

    fn name(&self) -> &str {
        Carrier::Ups.display_name()
    }

    fn is_live(&self) -> bool {
        false
    }
}
