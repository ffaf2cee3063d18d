//! Configuration types for the argus service

use argus_alpaca::DeviceType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            devices: Vec::new(),
        }
    }
}

/// Service-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_status_port")]
    pub status_port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            status_port: default_status_port(),
        }
    }
}

/// One monitored device. All device classes share the same connection
/// shape, so the class is a field rather than an enum payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_alpaca_port")]
    pub port: u16,
    /// Absent means device 0, or discovery when `discover` is set
    #[serde(default)]
    pub device_number: Option<u32>,
    /// Resolve the device number through the management API at startup
    #[serde(default)]
    pub discover: bool,
    #[serde(default = "default_polling_interval")]
    pub polling_interval_seconds: u64,
    /// Slow properties (site coordinates, limits, metadata) refresh every
    /// Nth poll cycle
    #[serde(default = "default_slow_poll_every")]
    pub slow_poll_every: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_status_port() -> u16 {
    8080
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_alpaca_port() -> u16 {
    11111
}

fn default_polling_interval() -> u64 {
    1
}

fn default_slow_poll_every() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::ArgusError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> crate::Result<()> {
    let mut names = std::collections::HashSet::new();
    for device in &config.devices {
        if device.name.is_empty() {
            return Err(crate::ArgusError::Config(
                "every device needs a non-empty name".to_string(),
            ));
        }
        if !names.insert(device.name.as_str()) {
            return Err(crate::ArgusError::Config(format!(
                "duplicate device name '{}'",
                device.name
            )));
        }
        if device.polling_interval_seconds == 0 {
            return Err(crate::ArgusError::Config(format!(
                "device '{}' has a zero polling interval",
                device.name
            )));
        }
    }
    Ok(())
}
