use super::*;

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_interval_secs: 3600,
            consumption_interval_secs: 60,
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.bwt-monservice.com".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            row_order: RowOrder::NewestFirst,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/perla-bridge.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: AccountConfig::default(),
            device_name: "BWT Perla".to_string(),
            polling: PollingConfig::default(),
            portal: PortalConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
        }
    }
}
