use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::stats::{records::RecordsConfig, rolling::RollingWindow};

/// Tunables for the statistics service and the dashboard server.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsConfig {
    pub rolling: RollingWindow,
    pub records: RecordsConfig,
    /// How many members the Top-N leaderboard shows
    pub top_members: usize,
    pub comeback_limit: usize,
    /// Lifetime of cached dashboard payloads
    pub cache_ttl: Duration,
    pub bind_addr: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            rolling: RollingWindow::default(),
            records: RecordsConfig::default(),
            top_members: 5,
            comeback_limit: 10,
            cache_ttl: Duration::from_secs(5 * 60), // 5 minutes
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl StatsConfig {
    /// Defaults overridden by any `PINSHEET_*` variables that are set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(size) = parse_var(&lookup, "PINSHEET_WINDOW_SIZE") {
            config.rolling.size = size;
        }
        if let Some(threshold) = parse_var(&lookup, "PINSHEET_TREND_THRESHOLD") {
            config.rolling.threshold_pct = threshold;
        }
        if let Some(months) = parse_var(&lookup, "PINSHEET_RECORDS_MONTHS") {
            config.records.months = months;
        }
        if let Some(max_sessions) = parse_var(&lookup, "PINSHEET_RECORDS_MAX_SESSIONS") {
            config.records.max_sessions = max_sessions;
        }
        if let Some(secs) = parse_var(&lookup, "PINSHEET_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(addr) = lookup("PINSHEET_BIND_ADDR") {
            config.bind_addr = addr;
        }

        config
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable config value");
            None
        }
    }
}
