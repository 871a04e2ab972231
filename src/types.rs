//! Shared types for the RATEWATCH monitor.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that provider, storage,
//! and dashboard modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Divisor for dimensional weight in inches³ → pounds (carrier standard).
pub const DIM_WEIGHT_DIVISOR: f64 = 139.0;

// ---------------------------------------------------------------------------
// Package & Route
// ---------------------------------------------------------------------------

/// A tracked package size. Dimensions in inches, weight in pounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    pub name: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {} lb)", self.name, self.dimensions(), self.weight)
    }
}

impl Package {
    /// Dimensions as a `LxWxH` string.
    pub fn dimensions(&self) -> String {
        format!("{}x{}x{}", self.length, self.width, self.height)
    }

    /// Volume in cubic inches.
    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    /// Dimensional weight in pounds (volume / 139).
    pub fn dimensional_weight(&self) -> f64 {
        self.volume() / DIM_WEIGHT_DIVISOR
    }

    /// Billable weight: the greater of actual and dimensional weight.
    pub fn billable_weight(&self) -> f64 {
        self.weight.max(self.dimensional_weight())
    }
}

/// A tracked shipping route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub name: String,
    pub origin_zip: String,
    pub origin_country: String,
    pub destination_zip: String,
    pub destination_country: String,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}) → {} ({})",
            self.name,
            self.origin_zip,
            self.origin_country,
            self.destination_zip,
            self.destination_country,
        )
    }
}

impl Route {
    /// Whether origin and destination are in the same country.
    pub fn is_domestic(&self) -> bool {
        self.origin_country == self.destination_country
    }
}

// ---------------------------------------------------------------------------
// Carrier
// ---------------------------------------------------------------------------

/// Carriers tracked by the estimated (demo mode) providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Carrier {
    Usps,
    Ups,
    FedEx,
    Dhl,
}

impl Carrier {
    /// All known carriers (useful for iteration).
    pub const ALL: &'static [Carrier] =
        &[Carrier::Usps, Carrier::Ups, Carrier::FedEx, Carrier::Dhl];

    /// Canonical display name, as stored in rate records.
    pub fn display_name(&self) -> &'static str {
        match self {
            Carrier::Usps => "USPS",
            Carrier::Ups => "UPS",
            Carrier::FedEx => "FedEx",
            Carrier::Dhl => "DHL Express",
        }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Carrier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usps" => Ok(Carrier::Usps),
            "ups" => Ok(Carrier::Ups),
            "fedex" => Ok(Carrier::FedEx),
            "dhl" | "dhl_express" | "dhl express" => Ok(Carrier::Dhl),
            _ => Err(anyhow::anyhow!("Unknown carrier: {s}")),
        }
    }
}

/// Map an aggregator carrier token (Shippo `provider`, EasyPost
/// `carrier`) to a canonical display name. Unknown tokens pass through
/// unchanged so new carriers still show up in the data.
pub fn normalize_carrier(token: &str) -> String {
    match token.to_lowercase().replace(['-', ' '], "_").as_str() {
        "usps" => "USPS".to_string(),
        "ups" => "UPS".to_string(),
        "fedex" | "fedexsmartpost" | "fedex_smart_post" => "FedEx".to_string(),
        "dhl" | "dhlexpress" | "dhl_express" => "DHL Express".to_string(),
        "dhlglobalmail" | "dhl_ecommerce" => "DHL".to_string(),
        "canadapost" | "canada_post" => "Canada Post".to_string(),
        "royalmail" | "royal_mail" => "Royal Mail".to_string(),
        "australia_post" => "Australia Post".to_string(),
        _ => token.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Rate
// ---------------------------------------------------------------------------

/// A single shipping rate quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rate {
    pub carrier: String,
    pub service: String,
    pub package_name: String,
    pub origin: String,
    pub origin_country: String,
    pub destination: String,
    pub destination_country: String,
    pub price: f64,
    pub currency: String,
    pub delivery_days: Option<u32>,
    pub quoted_at: DateTime<Utc>,
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] {} → {}: {:.2} {}",
            self.carrier,
            self.service,
            self.package_name,
            self.origin,
            self.destination,
            self.price,
            self.currency,
        )
    }
}

impl Rate {
    /// Identity key for change detection — excludes price and timestamp.
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.carrier, self.service, self.package_name, self.origin, self.destination,
        )
    }
}

// ---------------------------------------------------------------------------
// Rate change
// ---------------------------------------------------------------------------

/// Smallest price delta (USD) considered a real change.
pub const CHANGE_THRESHOLD: f64 = 0.01;

/// A detected change in price for a tracked rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateChange {
    pub rate: Rate,
    pub old_price: f64,
    pub new_price: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub detected_at: DateTime<Utc>,
}

impl fmt::Display for RateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: ${:.2} → ${:.2} ({:+.2}, {:+.1}%)",
            self.rate.carrier,
            self.rate.service,
            self.old_price,
            self.new_price,
            self.change_amount,
            self.change_percent,
        )
    }
}

impl RateChange {
    /// Build a change record from an old price and a fresh rate.
    pub fn between(old_price: f64, rate: Rate) -> Self {
        let new_price = rate.price;
        let change_amount = new_price - old_price;
        let change_percent = if old_price > 0.0 {
            change_amount / old_price * 100.0
        } else {
            0.0
        };
        Self {
            rate,
            old_price,
            new_price,
            change_amount,
            change_percent,
            detected_at: Utc::now(),
        }
    }

    pub fn is_increase(&self) -> bool {
        self.change_amount > 0.0
    }
}

// ---------------------------------------------------------------------------
// Fetch report
// ---------------------------------------------------------------------------

/// Outcome of a single provider's collection pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchReport {
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub success: bool,
    pub rates: Vec<Rate>,
    pub error: Option<String>,
}

impl fmt::Display for FetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(f, "{}: {} rates", self.provider, self.rates.len())
        } else {
            write!(
                f,
                "{}: FAILED ({})",
                self.provider,
                self.error.as_deref().unwrap_or("unknown error"),
            )
        }
    }
}

impl FetchReport {
    /// A successful report carrying the given rates. An empty rate list
    /// counts as a failure, matching how the collector treats it.
    pub fn ok(provider: &str, rates: Vec<Rate>) -> Self {
        Self {
            timestamp: Utc::now(),
            provider: provider.to_string(),
            success: !rates.is_empty(),
            rates,
            error: None,
        }
    }

    /// A failed report with an error message.
    pub fn failed(provider: &str, error: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            provider: provider.to_string(),
            success: false,
            rates: Vec::new(),
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for RATEWATCH.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
