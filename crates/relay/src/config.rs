//! Configuration file handling for the relay binary.
//!
//! The file is TOML. Missing sections and keys fall back to defaults, and a
//! missing file is created with the defaults written out.

use crate::cli::CliArgs;
use anyhow::{Context, Result};
use relay_core::RelayConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub liveness: LivenessSettings,
    pub retention: RetentionSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Network address to bind the HTTP server to (e.g., "0.0.0.0:3000")
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// When clients count as online, and when they are forgotten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessSettings {
    /// Seconds after the last heartbeat during which a client is online
    pub online_window_secs: u64,
    /// Seconds of silence after which a client is swept from every store
    pub client_timeout_secs: u64,
    /// Seconds between client sweeps
    pub sweep_interval_secs: u64,
}

impl Default for LivenessSettings {
    fn default() -> Self {
        Self {
            online_window_secs: 15,
            client_timeout_secs: 60,
            sweep_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionSettings {
    /// Seconds an unread execution result is kept
    pub exec_result_ttl_secs: u64,
    /// Seconds between execution-result sweeps
    pub exec_sweep_interval_secs: u64,
    /// Chat messages kept per client
    pub chat_history_cap: usize,
    /// Audit log entries kept per client
    pub log_cap: usize,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            exec_result_ttl_secs: 300,
            exec_sweep_interval_secs: 60,
            chat_history_cap: 100,
            log_cap: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads the configuration, writing a default file if none exists.
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the TOML file
    ///
    /// # Returns
    ///
    /// The parsed configuration (missing keys take their defaults), or an
    /// error if the file cannot be read, parsed or created.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the file values.
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(bind_address) = &args.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self
            .server
            .bind_address
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(format!(
                "Invalid bind address: {}",
                self.server.bind_address
            ));
        }

        let liveness = &self.liveness;
        if liveness.online_window_secs == 0 {
            return Err("online_window_secs must be greater than zero".to_string());
        }
        if liveness.client_timeout_secs < liveness.online_window_secs {
            return Err(format!(
                "client_timeout_secs ({}) must not be shorter than online_window_secs ({})",
                liveness.client_timeout_secs, liveness.online_window_secs
            ));
        }
        if liveness.sweep_interval_secs == 0 {
            return Err("sweep_interval_secs must be greater than zero".to_string());
        }

        let retention = &self.retention;
        if retention.exec_sweep_interval_secs == 0 {
            return Err("exec_sweep_interval_secs must be greater than zero".to_string());
        }
        if retention.chat_history_cap == 0 || retention.log_cap == 0 {
            return Err("chat_history_cap and log_cap must be greater than zero".to_string());
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, VALID_LOG_LEVELS
            ));
        }

        Ok(())
    }

    pub fn to_relay_config(&self) -> Result<RelayConfig> {
        Ok(RelayConfig {
            bind_address: self
                .server
                .bind_address
                .parse()
                .with_context(|| format!("invalid bind address {}", self.server.bind_address))?,
            online_window: Duration::from_secs(self.liveness.online_window_secs),
            client_timeout: Duration::from_secs(self.liveness.client_timeout_secs),
            sweep_interval: Duration::from_secs(self.liveness.sweep_interval_secs),
            exec_result_ttl: Duration::from_secs(self.retention.exec_result_ttl_secs),
            exec_sweep_interval: Duration::from_secs(self.retention.exec_sweep_interval_secs),
            chat_history_cap: self.retention.chat_history_cap,
            log_cap: self.retention.log_cap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_defaults_match_relay_defaults() {
        let relay = AppConfig::default().to_relay_config().unwrap();
        let expected = RelayConfig::default();

        assert_eq!(relay.bind_address, expected.bind_address);
        assert_eq!(relay.online_window, expected.online_window);
        assert_eq!(relay.client_timeout, expected.client_timeout);
        assert_eq!(relay.sweep_interval, expected.sweep_interval);
        assert_eq!(relay.exec_result_ttl, expected.exec_result_ttl);
        assert_eq!(relay.exec_sweep_interval, expected.exec_sweep_interval);
        assert_eq!(relay.chat_history_cap, expected.chat_history_cap);
        assert_eq!(relay.log_cap, expected.log_cap);
    }

    #[tokio::test]
    async fn test_load_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relay.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_load_partial_file_uses_defaults() {
        let toml_content = r#"
[server]
bind_address = "127.0.0.1:8088"

[liveness]
online_window_secs = 10

[logging]
level = "debug"
"#;
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8088");
        assert_eq!(config.liveness.online_window_secs, 10);
        assert_eq!(config.liveness.client_timeout_secs, 60);
        assert_eq!(config.retention, RetentionSettings::default());
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json_format);
    }

    #[tokio::test]
    async fn test_load_malformed_file_fails() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[server\nbind_address = ")
            .await
            .unwrap();

        assert!(AppConfig::load_from_file(temp_file.path()).await.is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            config_path: PathBuf::from("relay.toml"),
            bind_address: Some("127.0.0.1:9000".to_string()),
            log_level: Some("warn".to_string()),
            json_logs: true,
        };

        config.apply_cli(&args);
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_validation() {
        assert!(AppConfig::default().validate().is_ok());

        let mut config = AppConfig::default();
        config.server.bind_address = "not-an-address".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.liveness.client_timeout_secs = 5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.liveness.sweep_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retention.log_cap = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }
}
