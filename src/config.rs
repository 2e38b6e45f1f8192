use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use anyhow::{Context, anyhow, bail};
use chrono::Duration;

use crate::engine::checkin::CheckinSettings;
use crate::engine::geofence::Boundary;
use crate::engine::reconcile::ReconcileSettings;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub db_max_connections: u32,
    pub log_dir: String,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_checkin_per_min: u32,

    // Attendance processing
    pub processing_window_days: u32,
    pub punch_dedupe_seconds: i64,
    pub fingerprint_window_hours: i64,
    pub fingerprint_high_frequency: usize,
    pub geofence_boundary: Boundary,
    pub checkin_max_skew_secs: i64,
    pub device_timeout_secs: u64,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} must be set"))
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            server_addr: lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            db_max_connections: parse_in(&lookup, "DB_MAX_CONNECTIONS", 10, 1..=1000)?,
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),

            rate_protected_per_min: parse_in(&lookup, "RATE_PROTECTED_PER_MIN", 1000, 1..=60_000)?,
            rate_checkin_per_min: parse_in(&lookup, "RATE_CHECKIN_PER_MIN", 30, 1..=60_000)?,

            processing_window_days: parse_in(&lookup, "PROCESSING_WINDOW_DAYS", 2, 0..=366)?,
            punch_dedupe_seconds: parse_in(&lookup, "PUNCH_DEDUPE_SECONDS", 60, 0..=3600)?,
            fingerprint_window_hours: parse_in(&lookup, "FINGERPRINT_WINDOW_HOURS", 24, 1..=24 * 31)?,
            fingerprint_high_frequency: parse_in(&lookup, "FINGERPRINT_HIGH_FREQUENCY", 12, 1..=10_000)?,
            geofence_boundary: parse_or(&lookup, "GEOFENCE_BOUNDARY", Boundary::Inclusive)?,
            checkin_max_skew_secs: parse_in(&lookup, "CHECKIN_MAX_SKEW_SECS", 300, 0..=86_400)?,
            device_timeout_secs: parse_in(&lookup, "DEVICE_TIMEOUT_SECS", 5, 1..=300)?,
        })
    }

    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            dedupe_threshold: Duration::seconds(self.punch_dedupe_seconds),
            fingerprint_window: Duration::hours(self.fingerprint_window_hours),
            high_frequency_threshold: self.fingerprint_high_frequency,
        }
    }

    pub fn checkin_settings(&self) -> CheckinSettings {
        CheckinSettings {
            boundary: self.geofence_boundary,
            max_skew: Duration::seconds(self.checkin_max_skew_secs),
        }
    }

    pub fn device_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.device_timeout_secs)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

fn parse_in<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    range: RangeInclusive<T>,
) -> anyhow::Result<T>
where
    T: FromStr + PartialOrd + Display,
    T::Err: Display,
{
    let value = parse_or(lookup, key, default)?;
    if !range.contains(&value) {
        bail!("{key} must be between {} and {}, got {value}", range.start(), range.end());
    }
    Ok(value)
}
