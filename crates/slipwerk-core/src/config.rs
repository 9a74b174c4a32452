// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Settings live in a JSON file (created with defaults on first run) and can be
// overridden from the environment.  Every field has a default so partial
// files keep working across upgrades.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SlipwerkError};

/// File name of the settings file inside the data directory.
pub const CONFIG_FILE: &str = "settings.json";

/// Environment variable overriding [`AppConfig::api_base_url`].
pub const ENV_API_BASE_URL: &str = "SLIPWERK_API_BASE_URL";
/// Environment variable overriding [`ThermalConfig::printer_ip`].
pub const ENV_PRINTER_IP: &str = "SLIPWERK_PRINTER_IP";
/// Environment variable overriding [`ThermalConfig::printer_port`].
pub const ENV_PRINTER_PORT: &str = "SLIPWERK_PRINTER_PORT";

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Job queue base URL; jobs live at `<api_base_url>/templateJob`.
    pub api_base_url: String,
    /// Poll timer period in milliseconds.
    pub poll_interval_ms: u64,
    /// `limit` query parameter for the pending-job fetch.
    pub fetch_limit: u32,
    /// Whole-request timeout for the job queue HTTP client.
    pub http_timeout_secs: u64,
    /// Attempt budget per job.
    pub max_retries: u32,
    /// Consecutive connection-class failures before a job is abandoned.
    pub connection_failure_limit: u32,
    pub slip: SlipConfig,
    pub thermal: ThermalConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api/printer".into(),
            poll_interval_ms: 1000,
            fetch_limit: 10,
            http_timeout_secs: 30,
            max_retries: 5,
            connection_failure_limit: 5,
            slip: SlipConfig::default(),
            thermal: ThermalConfig::default(),
        }
    }
}

/// Slip printer transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlipConfig {
    pub connect_timeout_ms: u64,
    /// Idle timeout applied to every write on an open connection.
    pub io_timeout_ms: u64,
    /// Pause after every byte sent.
    pub byte_delay_ms: u64,
    /// Pause after the reverse-feed command.
    pub settle_delay_ms: u64,
    /// Line breaks sent before retracting the paper.
    pub feed_lines: usize,
    /// Printer labels containing this word (Turkish-locale lowercase) are slip printers.
    pub printer_keyword: String,
}

impl Default for SlipConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            io_timeout_ms: 1_000,
            byte_delay_ms: 2,
            settle_delay_ms: 100,
            feed_lines: 10,
            printer_keyword: "adisyon".into(),
        }
    }
}

impl SlipConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn byte_delay(&self) -> Duration {
        Duration::from_millis(self.byte_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Thermal printer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Printer used when a job carries no usable secondary address.
    pub printer_ip: String,
    pub printer_port: u16,
    pub timeout_ms: u64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            printer_ip: "192.168.2.214".into(),
            printer_port: 9100,
            timeout_ms: 10_000,
        }
    }
}

impl ThermalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AppConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Whether a job queue URL has been set.
    pub fn is_configured(&self) -> bool {
        !self.api_base_url.trim().is_empty()
    }

    /// Reject settings the poll engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.is_configured() {
            return Err(SlipwerkError::Config("api_base_url is empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(SlipwerkError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.max_retries == 0 {
            return Err(SlipwerkError::Config("max_retries must be > 0".into()));
        }
        if self.connection_failure_limit == 0 {
            return Err(SlipwerkError::Config(
                "connection_failure_limit must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Apply `SLIPWERK_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(ip) = lookup(ENV_PRINTER_IP).filter(|v| !v.trim().is_empty()) {
            self.thermal.printer_ip = ip.trim().to_string();
        }
        if let Some(port) = lookup(ENV_PRINTER_PORT) {
            match port.trim().parse() {
                Ok(p) => self.thermal.printer_port = p,
                Err(_) => warn!(value = %port, "ignoring invalid {ENV_PRINTER_PORT}"),
            }
        }
    }
}

/// Load settings from `path`, writing a default file when it does not exist.
pub fn load_or_create(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let config = AppConfig::default();
        persist_config(path, &config)?;
        info!(path = %path.display(), "created default settings file");
        return Ok(config);
    }

    let data = std::fs::read_to_string(path)?;
    let config = serde_json::from_str(&data)?;
    Ok(config)
}

/// Write settings to `path` as pretty JSON.
pub fn persist_config(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.connection_failure_limit, 5);
        assert_eq!(config.slip.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.slip.io_timeout(), Duration::from_secs(1));
        assert_eq!(config.slip.feed_lines, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = load_or_create(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{"api_base_url": "http://queue:8080/api/printer", "slip": {"byte_delay_ms": 0}}"#,
        )
        .unwrap();

        let config = load_or_create(&path).unwrap();
        assert_eq!(config.api_base_url, "http://queue:8080/api/printer");
        assert_eq!(config.slip.byte_delay_ms, 0);
        assert_eq!(config.slip.connect_timeout_ms, 10_000);
        assert_eq!(config.fetch_limit, 10);
    }

    #[test]
    fn persist_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = AppConfig::default();
        config.thermal.printer_ip = "10.0.0.9".into();

        persist_config(&path, &config).unwrap();
        assert_eq!(load_or_create(&path).unwrap(), config);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            ENV_API_BASE_URL => Some("http://10.1.1.1:3000/api/printer/".into()),
            ENV_PRINTER_PORT => Some("9101".into()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "http://10.1.1.1:3000/api/printer");
        assert_eq!(config.thermal.printer_port, 9101);
        assert_eq!(config.thermal.printer_ip, "192.168.2.214");
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| (key == ENV_PRINTER_PORT).then(|| "abc".to_string()));
        assert_eq!(config.thermal.printer_port, 9100);
    }

    #[test]
    fn validate_rejects_empty_url_and_zero_limits() {
        let mut config = AppConfig {
            api_base_url: "  ".into(),
            ..Default::default()
        };
        assert!(!config.is_configured());
        assert!(config.validate().is_err());

        config.api_base_url = "http://x".into();
        config.max_retries = 0;
        assert!(config.validate().is_err());
    }
}
