//! DHL Express estimated rates.
//!
//! DHL is primarily an international carrier; the US domestic lineup
//! is limited to express services. The domestic table only applies to
//! US-to-US lanes, everything else quotes international.

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
    ServiceTable { service: "DHL Express Domestic", base: 35.00, per_lb: 2.50, delivery_days: 2 },
    ServiceTable { service: "DHL Express 12:00", base: 55.00, per_lb: 4.00, delivery_days: 1 },
];

const INTERNATIONAL: &[ServiceTable] = &[
    ServiceTable { service: "DHL Express Worldwide", base: 70.00, per_lb: 6.50, delivery_days: 3 },
    ServiceTable { service: "DHL Express 9:00", base: 120.00, per_lb: 10.00, delivery_days: 2 },
    ServiceTable { service: "DHL Express 12:00", base: 100.00, per_lb: 8.50, delivery_days: 2 },
    ServiceTable { service: "DHL Economy Select", base: 50.00, per_lb: 4.50, delivery_days: 6 },
];

const DOMESTIC_SURCHARGE: f64 = 1.18;
const INTERNATIONAL_SURCHARGE: f64 = 1.20;

pub struct DhlEstimator;

impl DhlEstimator {
    fn quote(table: &[ServiceTable], surcharge: f64, package: &Package, route: &Route) -> Vec<Rate> {
        let billable = package.billable_weight();
        table
            .iter()
            .map(|t| {
                let price = (t.base + billable * t.per_lb) * surcharge;
                build_rate(Carrier::Dhl, t.service, package, route, price, Some(t.delivery_days))
            })
            .collect()
    }
}

#[async_trait]
impl RateProvider for DhlEstimator {
    async fn fetch_rates(&self, package: &Package, route: &Route) -> Result<Vec<Rate>> {
        let us_domestic = route.origin_country == "US" && route.destination_country == "US";
        if us_domestic {
            Ok(Self::quote(DOMESTIC, DOMESTIC_SURCHARGE, package, route))
        } else {
            Ok(Self::quote(INTERNATIONAL, INTERNATIONAL_SURCHARGE, package, route))
        }
    }

    fn name(&self) -> &str {
        Carrier::Dhl.display_name()
    }

    fn is_live(&self) -> bool {
        false
    }
}
