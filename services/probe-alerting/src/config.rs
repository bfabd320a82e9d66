//! Configuration types for probe alerting

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AlertingError;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub probe_name: String,
    #[serde(default)]
    pub alerts: Vec<AlertConfig>,
    /// When set, fired alerts are also published on an in-process channel
    /// with this many slots
    #[serde(default)]
    pub notify_channel_capacity: Option<usize>,
}

/// A single alerting rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Defaults to the probe name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub condition: ConditionConfig,
    #[serde(default)]
    pub notify: Option<NotifyConfig>,
}

/// Alert when `failures` of the last `total` attempts failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionConfig {
    #[serde(default = "default_failures")]
    pub failures: u32,
    /// Defaults to `failures`
    #[serde(default)]
    pub total: Option<u32>,
}

impl Default for ConditionConfig {
    fn default() -> Self {
        Self {
            failures: default_failures(),
            total: None,
        }
    }
}

impl ConditionConfig {
    pub fn total(&self) -> u32 {
        self.total.unwrap_or(self.failures)
    }
}

/// How to notify when an alert fires
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Shell-syntax command line with `{{field}}` placeholders
    #[serde(default)]
    pub command: String,
}

fn default_failures() -> u32 {
    1
}

impl Config {
    /// Alert name for `alert`, falling back to the probe name
    pub fn alert_name<'a>(&'a self, alert: &'a AlertConfig) -> &'a str {
        alert.name.as_deref().unwrap_or(&self.probe_name)
    }

    /// Check for settings that can never produce a sensible alert
    pub fn validate(&self) -> crate::Result<()> {
        if self.notify_channel_capacity == Some(0) {
            return Err(AlertingError::Config(
                "notify_channel_capacity must be greater than 0".to_string(),
            ));
        }

        for alert in &self.alerts {
            let name = self.alert_name(alert);
            let condition = &alert.condition;
            if condition.failures == 0 {
                return Err(AlertingError::Config(format!(
                    "alert '{}': condition.failures must be greater than 0",
                    name
                )));
            }
            if condition.total() < condition.failures {
                return Err(AlertingError::Config(format!(
                    "alert '{}': condition.total ({}) is less than condition.failures ({})",
                    name,
                    condition.total(),
                    condition.failures
                )));
            }
        }
        Ok(())
    }
}

/// Load and validate configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AlertingError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
