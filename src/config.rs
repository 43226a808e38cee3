//! Configuration management for Perla Bridge
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files, with environment overrides for credentials.
//! Cadence bounds are enforced here so a bad value is rejected at startup and
//! never reaches the poll loop.

use crate::error::{PerlaError, Result};
use crate::portal::RowOrder;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Allowed range for the status cadence, seconds
pub const STATUS_INTERVAL_RANGE: (u64, u64) = (300, 86_400);

/// Allowed range for the consumption cadence, seconds
pub const CONSUMPTION_INTERVAL_RANGE: (u64, u64) = (60, 3_600);

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Portal account and target device
    pub account: AccountConfig,

    /// Display name of the device
    pub device_name: String,

    /// Refresh cadences
    pub polling: PollingConfig,

    /// Vendor portal endpoint and HTTP behaviour
    pub portal: PortalConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Read-only state API binding
    pub web: WebConfig,
}

/// Portal credentials and device serial number
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AccountConfig {
    /// Portal login (e-mail)
    pub username: String,

    /// Portal password
    #[serde(skip_serializing)]
    pub password: String,

    /// Serial number printed on the softener
    pub serial_number: String,
}

// Keep the password out of debug output and therefore out of the logs.
impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("serial_number", &self.serial_number)
            .finish()
    }
}

/// Refresh cadences in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Minimum interval between device status refreshes
    pub status_interval_secs: u64,

    /// Coordinator tick; consumption counters refresh on every tick
    pub consumption_interval_secs: u64,
}

/// Vendor portal endpoint and HTTP behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Base URL of the portal, no trailing slash
    pub base_url: String,

    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Total per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Which consumption row is treated as the most recent one
    pub row_order: RowOrder,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console level override
    pub console_level: Option<String>,

    /// Optional file level override
    pub file_level: Option<String>,

    /// Path to log file (or directory)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Serve the read-only state API
    pub enabled: bool,

    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "perla_config.yaml",
            "/data/perla_config.yaml",
            "/etc/perla/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Override credentials from `PERLA_USERNAME`, `PERLA_PASSWORD`, `PERLA_SERIAL`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty("PERLA_USERNAME") {
            self.account.username = v;
        }
        if let Some(v) = non_empty("PERLA_PASSWORD") {
            self.account.password = v;
        }
        if let Some(v) = non_empty("PERLA_SERIAL") {
            self.account.serial_number = v;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.account.username.trim().is_empty() {
            return Err(PerlaError::validation(
                "account.username",
                "Username cannot be empty",
            ));
        }

        if self.account.password.is_empty() {
            return Err(PerlaError::validation(
                "account.password",
                "Password cannot be empty",
            ));
        }

        if self.account.serial_number.trim().is_empty() {
            return Err(PerlaError::validation(
                "account.serial_number",
                "Serial number cannot be empty",
            ));
        }

        check_range(
            "polling.status_interval_secs",
            self.polling.status_interval_secs,
            STATUS_INTERVAL_RANGE,
        )?;
        check_range(
            "polling.consumption_interval_secs",
            self.polling.consumption_interval_secs,
            CONSUMPTION_INTERVAL_RANGE,
        )?;

        if reqwest::Url::parse(&self.portal.base_url).is_err() {
            return Err(PerlaError::validation(
                "portal.base_url",
                "Must be an absolute URL",
            ));
        }

        if self.portal.connect_timeout_secs == 0 || self.portal.request_timeout_secs == 0 {
            return Err(PerlaError::validation(
                "portal.request_timeout_secs",
                "Timeouts must be greater than 0",
            ));
        }

        if self.portal.connect_timeout_secs > self.portal.request_timeout_secs {
            return Err(PerlaError::validation(
                "portal.connect_timeout_secs",
                "Must not exceed request_timeout_secs",
            ));
        }

        if self.web.enabled && self.web.port == 0 {
            return Err(PerlaError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn check_range(field: &str, value: u64, (min, max): (u64, u64)) -> Result<()> {
    if value < min || value > max {
        return Err(PerlaError::validation(
            field.to_string(),
            format!("{} is outside the allowed range [{}, {}]", value, min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.account.username = "user@example.com".to_string();
        config.account.password = "secret".to_string();
        config.account.serial_number = "SN123456".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.polling.status_interval_secs, 3600);
        assert_eq!(config.polling.consumption_interval_secs, 60);
        assert_eq!(config.portal.base_url, "https://www.bwt-monservice.com");
        assert_eq!(config.portal.row_order, RowOrder::NewestFirst);
    }

    #[test]
    fn test_config_validation() {
        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.account.serial_number = "  ".to_string();
        assert!(config.validate().is_err());

        config = valid_config();
        config.polling.status_interval_secs = 299;
        assert!(config.validate().is_err());

        config = valid_config();
        config.polling.status_interval_secs = 86_400;
        assert!(config.validate().is_ok());

        config = valid_config();
        config.polling.consumption_interval_secs = 3_601;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides_from(|name| match name {
            "PERLA_USERNAME" => Some("env-user".to_string()),
            "PERLA_PASSWORD" => Some(String::new()),
            "PERLA_SERIAL" => Some("SN-ENV".to_string()),
            _ => None,
        });
        assert_eq!(config.account.username, "env-user");
        assert!(config.account.password.is_empty());
        assert_eq!(config.account.serial_number, "SN-ENV");
    }

    #[test]
    fn test_password_not_serialized_or_debugged() {
        let config = valid_config();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("secret"));
        assert!(!format!("{:?}", config.account).contains("secret"));
    }
}
