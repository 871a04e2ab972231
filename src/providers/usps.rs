//! USPS estimated rates.
//!
//! Table-based estimates derived from 2024 USPS retail pricing.
//! USPS only serves US-origin lanes; the rest return no quotes.

use anyhow::Result;
use async_trait::async_trait;

use super::{build_rate, RateProvider};
use crate::types::{Carrier, Package, Rate, Route};

/// Base + per-pound pricing for a service level.
struct ServiceTable {
    service: &'static str,
    base: f64,
    per_lb: f64,
    delivery_days: Option<u32>,
}

const DOMESTIC: &[ServiceTable] = &[
    ServiceTable { service: "Priority Mail", base: 8.70, per_lb: 1.50, delivery_days: Some(3) },
    ServiceTable { service: "Priority Mail Express", base: 28.75, per_lb: 2.00, delivery_days: Some(2) },
    ServiceTable { service: "USPS Ground Advantage", base: 5.50, per_lb: 0.80, delivery_days: Some(5) },
    ServiceTable { service: "Media Mail", base: 3.65, per_lb: 0.65, delivery_days: Some(8) },
];

const INTERNATIONAL: &[ServiceTable] = &[
    ServiceTable { service: "Priority Mail International", base: 45.00, per_lb: 5.00, delivery_days: Some(10) },
    ServiceTable { service: "Priority Mail Express International", base: 65.00, per_lb: 7.00, delivery_days: Some(5) },
    ServiceTable { service: "First-Class Package International", base: 15.00, per_lb: 3.00, delivery_days: Some(14) },
];

/// First-Class international is limited to 4 lb.
const FIRST_CLASS_MAX_LB: f64 = 4.0;

pub struct UspsEstimator;

impl UspsEstimator {
    fn domestic(&self, package: &Package, route: &Route) -> Vec<Rate> {
        DOMESTIC
            .iter()
            .map(|t| {
                let mut price = t.base + package.weight * t.per_lb;
                // USPS prices by volume tier rather than dimensional weight
                let volume = package.volume();
                if volume > 500.0 {
                    price *= 1.2;
                }
                if volume > 1000.0 {
                    price *= 1.3;
                }
                build_rate(Carrier::Usps, t.service, package, route, price, t.delivery_days)
            })
            .collect()
    }

    fn international(&self, package: &Package, route: &Route) -> Vec<Rate> {
        INTERNATIONAL
            .iter()
            .filter(|t| {
                t.service != "First-Class Package International"
                    || package.weight <= FIRST_CLASS_MAX_LB
            })
            .map(|t| {
                let price = t.base + package.weight * t.per_lb;
                build_rate(Carrier::Usps, t.service, package, route, price, t.delivery_days)
            })
            .collect()
    }
}

#[async_trait]
impl RateProvider for UspsEstimator {
    async fn fetch_rates(&self, package: &Package, route: &Route) -> Result<Vec<Rate>> {
        if route.origin_country != "US" {
            return Ok(Vec::new());
        }
        if route.destination_country == "US" {
            Ok(self.domestic(package, route))
        } else {
            Ok(self.international(package, route))
        }
    }

    fn name(&self) -> &str {
        Carrier::Usps.display_name()
    }

    fn is_live(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_package() -> Package {
        Package {
            name: "Small".to_string(),
            length: 6.0,
            width: 4.0,
            height: 2.0,
            weight: 1.0,
        }
    }

    fn large_package() -> Package {
        Package {
            name: "Large".to_string(),
            length: 18.0,
            width: 12.0,
            height: 10.0,
            weight: 15.0,
        }
    }

    fn domestic_route() -> Route {
        Route {
            name: "NY to LA".to_string(),
            origin_zip: "10001".to_string(),
            origin_country: "US".to_string(),
            destination_zip: "90001".to_string(),
            destination_country: "US".to_string(),
        }
    }

    fn international_route() -> Route {
        Route {
            name: "US to UK".to_string(),
            origin_zip: "10001".to_string(),
            origin_country: "US".to_string(),
            destination_zip: "SW1A 1AA".to_string(),
            destination_country: "GB".to_string(),
        }
    }

    #[tokio::test]
    async fn test_domestic_service_set() {
        let rates = UspsEstimator
            .fetch_rates(&small_package(), &domestic_route())
            .await
            .unwrap();
        assert_eq!(rates.len(), 4);
        assert!(rates.iter().all(|r| r.carrier == "USPS"));
        assert!(rates.iter().any(|r| r.service == "Priority Mail"));
        assert!(rates.iter().any(|r| r.service == "Media Mail"));
    }

    #[tokio::test]
    async fn test_small_package_no_volume_multiplier() {
        // Small = 48 in³, below both volume tiers
        let rates = UspsEstimator
            .fetch_rates(&small_package(), &domestic_route())
            .await
            .unwrap();
        let priority = rates.iter().find(|r| r.service == "Priority Mail").unwrap();
        // 8.70 + 1 * 1.50 = 10.20
        assert!((priority.price - 10.20).abs() < 1e-10);
    }

    #[tokio::test]
    async fn test_large_package_both_volume_multipliers() {
        // Large = 2160 in³, over 500 and over 1000 → ×1.2 ×1.3
        let rates = UspsEstimator
            .fetch_rates(&large_package(), &domestic_route())
            .await
            .unwrap();
        let priority = rates.iter().find(|r| r.service == "Priority Mail").unwrap();
        let expected: f64 = (8.70 + 15.0 * 1.50) * 1.2 * 1.3;
        assert!((priority.price - (expected * 100.0).round() / 100.0).abs() < 1e-10);
    }

    #[tokio::test]
    async fn test_international_first_class_weight_cutoff() {
        let light = UspsEstimator
            .fetch_rates(&small_package(), &international_route())
            .await
            .unwrap();
        assert!(light.iter().any(|r| r.service == "First-Class Package International"));

        let heavy = UspsEstimator
            .fetch_rates(&large_package(), &international_route())
            .await
            .unwrap();
        assert!(!heavy.iter().any(|r| r.service == "First-Class Package International"));
        assert_eq!(heavy.len(), 2);
    }

    #[tokio::test]
    async fn test_non_us_origin_returns_nothing() {
        let mut route = domestic_route();
        route.origin_country = "GB".to_string();
        let rates = UspsEstimator
            .fetch_rates(&small_package(), &route)
            .await
            .unwrap();
        assert!(rates.is_empty());
    }

    #[test]
    fn test_provider_identity() {
        assert_eq!(UspsEstimator.name(), "USPS");
        assert!(!UspsEstimator.is_live());
    }
}
