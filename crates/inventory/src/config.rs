//! Ledger configuration.
//!
//! Defaults reproduce the storefront's behavior. Hosts can override them with
//! `STOCKLEDGER_*` environment variables via [`LedgerConfig::from_env`].

use thiserror::Error;

pub const ENV_CRITICAL_PERCENT: &str = "STOCKLEDGER_CRITICAL_PERCENT";
pub const ENV_HISTORY_LIMIT: &str = "STOCKLEDGER_HISTORY_LIMIT";
pub const ENV_PUBLISH_EVENTS: &str = "STOCKLEDGER_PUBLISH_EVENTS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// On-hand stock below this percentage of the reorder point is critical.
    pub critical_percent: u8,
    /// Movement-history page size when a query gives no limit.
    pub default_history_limit: usize,
    /// Publish ledger events to bus subscribers.
    pub publish_events: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            critical_percent: 50,
            default_history_limit: 50,
            publish_events: true,
        }
    }
}

impl LedgerConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CRITICAL_PERCENT) {
            config.critical_percent = parse(ENV_CRITICAL_PERCENT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HISTORY_LIMIT) {
            config.default_history_limit = parse(ENV_HISTORY_LIMIT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PUBLISH_EVENTS) {
            config.publish_events = parse_bool(ENV_PUBLISH_EVENTS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.critical_percent > 100 {
            return Err(ConfigError::Invalid {
                key: ENV_CRITICAL_PERCENT,
                value: self.critical_percent.to_string(),
                reason: "must be between 0 and 100".to_string(),
            });
        }
        if self.default_history_limit == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_HISTORY_LIMIT,
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
