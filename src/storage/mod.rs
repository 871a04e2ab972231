//! JSON file storage with change detection.
//!
//! Rates land in per-day files (`YYYY-MM-DD.json`) under the data
//! directory; detected price changes accumulate in `changes.json`,
//! capped at the most recent 1000.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{Rate, RateChange, CHANGE_THRESHOLD};

/// How many days back `latest_rates` scans before giving up.
const LOOKBACK_DAYS: i64 = 7;

/// Maximum number of entries kept in `changes.json`.
const MAX_CHANGES: usize = 1000;

// ---------------------------------------------------------------------------
// File formats
// ---------------------------------------------------------------------------

/// One collection pass appended to a day file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateEntry {
    pub timestamp: DateTime<Utc>,
    pub rates: Vec<Rate>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DayFile {
    #[serde(default)]
    entries: Vec<RateEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChangeLog {
    #[serde(default)]
    changes: Vec<RateChange>,
}

/// Summary of what the store currently tracks.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub last_collection: Option<DateTime<Utc>>,
    pub total_rates: usize,
    pub carriers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct RateStore {
    data_dir: PathBuf,
}

impl RateStore {
    /// Opens a store rooted at `data_dir`, creating it if missing.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
        Ok(Self { data_dir })
    }

    fn day_path(&self, date: DateTime<Local>) -> PathBuf {
        self.data_dir.join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    fn changes_path(&self) -> PathBuf {
        self.data_dir.join("changes.json")
    }

    fn load_day(&self, path: &Path) -> Result<DayFile> {
        if !path.exists() {
            return Ok(DayFile::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("bad day file {}", path.display()))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let raw = serde_json::to_string_pretty(value)?;
        fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Most recent rate per key, scanning back up to seven days and
    /// stopping at the first day that has data.
    pub fn latest_rates(&self) -> Result<HashMap<String, Rate>> {
        let mut latest: HashMap<String, Rate> = HashMap::new();
        let now = Local::now();

        for days_ago in 0..LOOKBACK_DAYS {
            let path = self.day_path(now - Duration::days(days_ago));
            if !path.exists() {
                continue;
            }
            let day = self.load_day(&path)?;
            for entry in day.entries.iter().rev() {
                for rate in &entry.rates {
                    latest.entry(rate.key()).or_insert_with(|| rate.clone());
                }
            }
            if !latest.is_empty() {
                break;
            }
        }

        Ok(latest)
    }

    /// Saves a collection pass, detecting price changes against the
    /// latest known rates.
    ///
    /// Returns the rates actually recorded (new keys plus changed
    /// prices; unchanged rates are not re-appended) and the detected
    /// changes. A price delta above one cent counts as a change.
    pub fn save_rates(&self, rates: &[Rate]) -> Result<(Vec<Rate>, Vec<RateChange>)> {
        if rates.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let latest = self.latest_rates()?;
        let mut new_rates: Vec<Rate> = Vec::new();
        let mut changes: Vec<RateChange> = Vec::new();

        for rate in rates {
            match latest.get(&rate.key()) {
                Some(old) => {
                    if (old.price - rate.price).abs() > CHANGE_THRESHOLD {
                        changes.push(RateChange::between(old.price, rate.clone()));
                        new_rates.push(rate.clone());
                    }
                }
                None => new_rates.push(rate.clone()),
            }
        }

        if !new_rates.is_empty() {
            let path = self.day_path(Local::now());
            let mut day = self.load_day(&path)?;
            day.entries.push(RateEntry {
                timestamp: Utc::now(),
                rates: new_rates.clone(),
            });
            self.write_json(&path, &day)?;

            if !changes.is_empty() {
                self.append_changes(&changes)?;
            }
        }

        info!(
            recorded = new_rates.len(),
            changes = changes.len(),
            unchanged = rates.len() - new_rates.len(),
            "rates saved"
        );
        Ok((new_rates, changes))
    }

    fn append_changes(&self, changes: &[RateChange]) -> Result<()> {
        let path = self.changes_path();
        let mut log: ChangeLog = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("bad changes file {}", path.display()))?
        } else {
            ChangeLog::default()
        };

        log.changes.extend_from_slice(changes);
        if log.changes.len() > MAX_CHANGES {
            let excess = log.changes.len() - MAX_CHANGES;
            log.changes.drain(..excess);
        }

        self.write_json(&path, &log)
    }

    /// Recent changes, most recent first.
    pub fn recent_changes(&self, limit: usize) -> Result<Vec<RateChange>> {
        let path = self.changes_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let log: ChangeLog =
            serde_json::from_str(&raw).with_context(|| format!("bad changes file {}", path.display()))?;

        let recent: Vec<RateChange> = log.changes.into_iter().rev().take(limit).collect();
        debug!(count = recent.len(), "loaded recent changes");
        Ok(recent)
    }

    /// All entries recorded in the last `days` days, sorted by timestamp.
    pub fn historical_entries(&self, days: i64) -> Result<Vec<RateEntry>> {
        let mut entries: Vec<RateEntry> = Vec::new();
        let now = Local::now();

        for days_ago in 0..days {
            let path = self.day_path(now - Duration::days(days_ago));
            if path.exists() {
                entries.extend(self.load_day(&path)?.entries);
            }
        }

        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }

    /// Price history for one carrier/service/package combination.
    pub fn rate_history(
        &self,
        carrier: &str,
        service: &str,
        package: &str,
        days: i64,
    ) -> Result<Vec<(DateTime<Utc>, f64)>> {
        let mut history: Vec<(DateTime<Utc>, f64)> = Vec::new();

        for entry in self.historical_entries(days)? {
            for rate in &entry.rates {
                if rate.carrier == carrier
                    && rate.service == service
                    && rate.package_name == package
                {
                    history.push((entry.timestamp, rate.price));
                }
            }
        }

        history.sort_by_key(|(ts, _)| *ts);
        Ok(history)
    }

    /// Last collection timestamp plus counts of what is tracked.
    pub fn status(&self) -> Result<StoreStatus> {
        let latest = self.latest_rates()?;

        if latest.is_empty() {
            return Ok(StoreStatus {
                last_collection: None,
                total_rates: 0,
                carriers: Vec::new(),
            });
        }

        let last_collection = latest.values().map(|r| r.quoted_at).max();
        let mut carriers: Vec<String> = latest
            .values()
            .map(|r| r.carrier.clone())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        carriers.sort();

        Ok(StoreStatus {
            last_collection,
            total_rates: latest.len(),
            carriers,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
