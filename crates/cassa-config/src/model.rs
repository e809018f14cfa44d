use rust_decimal::Decimal;
use serde::{de::Deserializer, Deserialize, Serialize};
use std::{fmt, path::PathBuf};

use crate::ConfigError;

/// Operator preferences. Every field has a default so partial files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_locale")]
    pub locale: String,
    #[serde(default = "Config::default_currency")]
    pub currency: String,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "Config::default_ui_color_enabled")]
    pub ui_color_enabled: bool,
    /// Days covered by `project` when no horizon is given.
    #[serde(default = "Config::default_horizon_days")]
    pub horizon_days: i64,
    /// Weeks projected below this balance are flagged (soglia alert cassa).
    #[serde(default = "Config::default_liquidity_alert_threshold")]
    pub liquidity_alert_threshold: Decimal,
    /// Deadline applied to bulk store reads.
    #[serde(default = "Config::default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default = "Config::default_settlement_retry_attempts")]
    pub settlement_retry_attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom root for the obligation store. Defaults to `<data dir>/cassa`.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: Self::default_locale(),
            currency: Self::default_currency(),
            theme: Theme::default(),
            ui_color_enabled: Self::default_ui_color_enabled(),
            horizon_days: Self::default_horizon_days(),
            liquidity_alert_threshold: Self::default_liquidity_alert_threshold(),
            store_timeout_ms: Self::default_store_timeout_ms(),
            settlement_retry_attempts: Self::default_settlement_retry_attempts(),
            data_dir: None,
        }
    }
}

impl Config {
    pub fn default_locale() -> String {
        "it-IT".into()
    }

    pub fn default_currency() -> String {
        "EUR".into()
    }

    pub fn default_ui_color_enabled() -> bool {
        true
    }

    pub fn default_horizon_days() -> i64 {
        90
    }

    pub fn default_liquidity_alert_threshold() -> Decimal {
        Decimal::new(5000, 0)
    }

    pub fn default_store_timeout_ms() -> u64 {
        5000
    }

    pub fn default_settlement_retry_attempts() -> u32 {
        3
    }

    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(path) = &self.data_dir {
            return path.clone();
        }

        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join("cassa")
    }

    /// Rejects values the services would refuse later anyway.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon_days <= 0 {
            return Err(ConfigError::Invalid {
                field: "horizon_days",
                reason: format!("must be positive, got {}", self.horizon_days),
            });
        }
        if self.settlement_retry_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "settlement_retry_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "currency",
                reason: "cannot be empty".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Plain,
    #[default]
    Iconic,
}

impl Theme {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "plain" => Theme::Plain,
            _ => Theme::Iconic,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Theme::Plain => "plain",
            Theme::Iconic => "iconic",
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.map(|v| Theme::parse(&v)).unwrap_or_default())
    }
}
