//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`. A missing config file falls
//! back to built-in defaults so the monitor runs with zero setup —
//! mode selection then depends only on which API key env vars are set.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::types::{Package, Route};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub http: HttpConfig,
    pub providers: ProvidersConfig,
    pub storage: StorageConfig,
    pub dashboard: DashboardConfig,
    pub packages: Vec<Package>,
    pub routes: Vec<Route>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between collection cycles (1 hour by default).
    pub poll_interval_secs: u64,
    /// How many days of history the dashboard serves by default.
    pub history_days: u32,
    /// Run the first collection immediately instead of waiting a full interval.
    pub run_on_start: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3600,
            history_days: 30,
            run_on_start: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Env var holding the Shippo API key.
    pub shippo_api_key_env: String,
    /// Env var holding the EasyPost API key.
    pub easypost_api_key_env: String,
    /// Estimated carriers active in demo mode.
    pub carriers: Vec<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            shippo_api_key_env: "SHIPPO_API_KEY".to_string(),
            easypost_api_key_env: "EASYPOST_API_KEY".to_string(),
            carriers: vec![
                "usps".to_string(),
                "ups".to_string(),
                "fedex".to_string(),
                "dhl".to_string(),
            ],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/rates".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8501,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            http: HttpConfig::default(),
            providers: ProvidersConfig::default(),
            storage: StorageConfig::default(),
            dashboard: DashboardConfig::default(),
            packages: default_packages(),
            routes: default_routes(),
        }
    }
}

/// Standard packages tracked out of the box.
fn default_packages() -> Vec<Package> {
    vec![
        Package {
            name: "Small".to_string(),
            length: 6.0,
            width: 4.0,
            height: 2.0,
            weight: 1.0,
        },
        Package {
            name: "Medium".to_string(),
            length: 12.0,
            width: 8.0,
            height: 6.0,
            weight: 5.0,
        },
        Package {
            name: "Large".to_string(),
            length: 18.0,
            width: 12.0,
            height: 10.0,
            weight: 15.0,
        },
    ]
}

/// Standard routes tracked out of the box.
fn default_routes() -> Vec<Route> {
    vec![
        Route {
            name: "US Domestic (NY to LA)".to_string(),
            origin_zip: "10001".to_string(),
            origin_country: "US".to_string(),
            destination_zip: "90001".to_string(),
            destination_country: "US".to_string(),
        },
        Route {
            name: "US to UK".to_string(),
            origin_zip: "10001".to_string(),
            origin_country: "US".to_string(),
            destination_zip: "SW1A 1AA".to_string(),
            destination_country: "GB".to_string(),
        },
    ]
}

impl AppConfig {
    /// Load configuration from a TOML file, or defaults if it doesn't exist.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve a non-empty API key from the env var named in the config.
    /// Returns None when the var is unset or empty.
    pub fn resolve_key(env_name: &str) -> Option<String> {
        match std::env::var(env_name) {
            Ok(v) if !v.trim().is_empty() => Some(v),
            _ => None,
        }
    }
}
