//! Configuration for the Splitly service

use serde::{Deserialize, Serialize};

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Reminder configuration
    pub reminder: ReminderConfig,

    /// Group defaults
    pub groups: GroupDefaults,

    /// Settle-up configuration
    pub settlements: SettlementConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "splitly".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_json: false,
            reminder: ReminderConfig::default(),
            groups: GroupDefaults::default(),
            settlements: SettlementConfig::default(),
        }
    }
}

/// Reminder sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Run the automatic sweep
    pub enabled: bool,

    /// Times of day (UTC, `HH:MM`) when the sweep runs
    pub times: Vec<String>,

    /// Scheduler tick in seconds
    pub check_interval_secs: u64,

    /// Manual reminders allowed per debtor, group and creditor per day
    pub manual_daily_limit: usize,

    /// Base URL used for links in reminder emails
    pub app_base_url: String,

    /// From address for reminder emails
    pub sender: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            times: vec!["09:00".to_string()],
            check_interval_secs: 30,
            manual_daily_limit: 5,
            app_base_url: "http://localhost:5173".to_string(),
            sender: "Splitly <no-reply@splitly.app>".to_string(),
        }
    }
}

/// Defaults applied to newly created groups
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDefaults {
    /// ISO 4217 currency code
    pub default_currency: String,

    /// Display symbol for the currency
    pub default_currency_symbol: String,
}

impl Default for GroupDefaults {
    fn default() -> Self {
        Self {
            default_currency: "INR".to_string(),
            default_currency_symbol: "₹".to_string(),
        }
    }
}

/// Settle-up configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// How long a settle-all result stays replayable under its
    /// idempotency key, in seconds
    pub replay_ttl_secs: u64,
}

impl SettlementConfig {
    /// Replay TTL as a duration, capped at what `chrono` can represent
    pub fn replay_ttl(&self) -> chrono::Duration {
        let secs = i64::try_from(self.replay_ttl_secs).unwrap_or(i64::MAX);
        chrono::Duration::seconds(secs.min(i64::MAX / 1_000))
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            replay_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(times) = std::env::var("SPLITLY_REMINDER_TIMES") {
            config.reminder.times = times
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }

        if let Ok(url) = std::env::var("SPLITLY_APP_BASE_URL") {
            config.reminder.app_base_url = url;
        }

        if let Ok(enabled) = std::env::var("SPLITLY_REMINDERS_ENABLED") {
            config.reminder.enabled = parse_bool("SPLITLY_REMINDERS_ENABLED", &enabled)?;
        }

        if let Ok(json) = std::env::var("SPLITLY_LOG_JSON") {
            config.log_json = parse_bool("SPLITLY_LOG_JSON", &json)?;
        }

        Ok(config)
    }
}

fn parse_bool(name: &str, value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(crate::Error::Config(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}
