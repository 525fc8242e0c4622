//! Configuration types for the mission-control service

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::model::{Device, DeviceStatus};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub activation: ActivationConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Where telemetry and device records live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DatabaseConfig {
    /// In-process store, optionally seeded with devices
    #[serde(rename = "memory")]
    Memory {
        #[serde(default)]
        devices: Vec<SeedDevice>,
    },
    /// Hosted Postgres behind a PostgREST-style interface
    #[serde(rename = "rest")]
    Rest {
        url: String,
        api_key: String,
        #[serde(default = "default_telemetry_table")]
        telemetry_table: String,
        #[serde(default = "default_devices_table")]
        devices_table: String,
    },
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::Memory {
            devices: Vec::new(),
        }
    }
}

impl DatabaseConfig {
    pub fn type_name(&self) -> &str {
        match self {
            DatabaseConfig::Memory { .. } => "memory",
            DatabaseConfig::Rest { .. } => "rest",
        }
    }
}

/// A device record provided in the config file for the memory store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedDevice {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Argon2 PHC string, see `mission-control hash-pin`
    pub pin_hash: String,
    #[serde(default = "default_seed_status")]
    pub status: DeviceStatus,
}

impl From<SeedDevice> for Device {
    fn from(seed: SeedDevice) -> Self {
        Device {
            id: seed.id,
            name: seed.name,
            pin_hash: seed.pin_hash,
            status: seed.status,
            launch: None,
            activated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret expected in `X-Webhook-Secret`; unchecked when absent
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Rows read per poll when building the fleet snapshot
    #[serde(default = "default_latest_limit")]
    pub latest_limit: usize,
    /// Upper bound on points returned for one flight path
    #[serde(default = "default_path_limit")]
    pub path_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            latest_limit: default_latest_limit(),
            path_limit: default_path_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationConfig {
    /// How long the launch button must be held
    #[serde(default = "default_hold_duration", with = "humantime_serde")]
    pub hold_duration: Duration,
    #[serde(default = "default_session_ttl", with = "humantime_serde")]
    pub session_ttl: Duration,
    /// Coarsest geolocation fix accepted for a launch site
    #[serde(default = "default_max_location_accuracy")]
    pub max_location_accuracy_m: f64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            hold_duration: default_hold_duration(),
            session_ttl: default_session_ttl(),
            max_location_accuracy_m: default_max_location_accuracy(),
        }
    }
}

/// Simulated telemetry feed for running without hardware
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_demo_balloons")]
    pub balloons: usize,
    #[serde(default = "default_demo_interval", with = "humantime_serde")]
    pub interval: Duration,
    #[serde(default = "default_demo_seed")]
    pub seed: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            balloons: default_demo_balloons(),
            interval: default_demo_interval(),
            seed: default_demo_seed(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_telemetry_table() -> String {
    "telemetry".to_string()
}

fn default_devices_table() -> String {
    "devices".to_string()
}

fn default_seed_status() -> DeviceStatus {
    DeviceStatus::Storage
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_latest_limit() -> usize {
    500
}

fn default_path_limit() -> usize {
    2000
}

fn default_hold_duration() -> Duration {
    Duration::from_secs(3)
}

fn default_session_ttl() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_max_location_accuracy() -> f64 {
    100.0
}

fn default_demo_balloons() -> usize {
    5
}

fn default_demo_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_demo_seed() -> u64 {
    42
}

/// Replace an `env:NAME` reference with the variable's value
fn resolve_secret(value: &str) -> crate::Result<String> {
    match value.strip_prefix("env:") {
        Some(name) => std::env::var(name).map_err(|_| {
            crate::MissionControlError::Config(format!(
                "Environment variable {} referenced in config is not set",
                name
            ))
        }),
        None => Ok(value.to_string()),
    }
}

impl Config {
    /// Resolve `env:NAME` references in secret fields
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        if let DatabaseConfig::Rest { api_key, .. } = &mut self.database {
            *api_key = resolve_secret(api_key)?;
        }
        if let Some(secret) = &mut self.webhook.secret {
            *secret = resolve_secret(secret)?;
        }
        Ok(())
    }
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::MissionControlError::Config(format!(
            "Failed to read config file {:?}: {}",
            path, e
        ))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "server": {"port": 9000},
            "database": {
                "type": "rest",
                "url": "https://db.example.org",
                "api_key": "service-key",
                "telemetry_table": "balloon_telemetry"
            },
            "webhook": {"secret": "hunter2"},
            "dashboard": {"poll_interval": "45s", "latest_limit": 100, "path_limit": 50},
            "activation": {"hold_duration": "2s", "session_ttl": "5m", "max_location_accuracy_m": 50},
            "demo": {"enabled": true, "balloons": 3, "interval": "1s", "seed": 9}
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.type_name(), "rest");
        match &config.database {
            DatabaseConfig::Rest {
                url,
                api_key,
                telemetry_table,
                devices_table,
            } => {
                assert_eq!(url, "https://db.example.org");
                assert_eq!(api_key, "service-key");
                assert_eq!(telemetry_table, "balloon_telemetry");
                assert_eq!(devices_table, "devices");
            }
            other => panic!("expected rest database, got {other:?}"),
        }
        assert_eq!(config.webhook.secret.as_deref(), Some("hunter2"));
        assert_eq!(config.dashboard.poll_interval, Duration::from_secs(45));
        assert_eq!(config.dashboard.latest_limit, 100);
        assert_eq!(config.activation.hold_duration, Duration::from_secs(2));
        assert_eq!(config.activation.session_ttl, Duration::from_secs(300));
        assert_eq!(config.activation.max_location_accuracy_m, 50.0);
        assert!(config.demo.enabled);
        assert_eq!(config.demo.interval, Duration::from_secs(1));
    }

    #[test]
    fn parse_minimal_config() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.type_name(), "memory");
        assert!(config.webhook.secret.is_none());
        assert_eq!(config.dashboard.poll_interval, Duration::from_secs(30));
        assert_eq!(config.activation.hold_duration, Duration::from_secs(3));
        assert_eq!(config.activation.session_ttl, Duration::from_secs(900));
        assert!(!config.demo.enabled);
    }

    #[test]
    fn parse_memory_seed_devices() {
        let json = r#"{
            "database": {
                "type": "memory",
                "devices": [
                    {"id": "SL-001", "name": "Skylark", "pin_hash": "$argon2id$stub"},
                    {"id": "SL-002", "pin_hash": "$argon2id$stub", "status": "retired"}
                ]
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let DatabaseConfig::Memory { devices } = config.database else {
            panic!("expected memory database");
        };
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].status, DeviceStatus::Storage);
        assert_eq!(devices[1].status, DeviceStatus::Retired);

        let device: Device = devices[0].clone().into();
        assert_eq!(device.display_name(), "Skylark");
        assert!(device.launch.is_none());
    }

    #[test]
    fn unknown_database_type_is_rejected() {
        let json = r#"{"database": {"type": "sqlite"}}"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn resolve_secrets_reads_environment() {
        std::env::set_var("MISSION_CONTROL_TEST_WEBHOOK_SECRET", "from-env");
        let mut config = Config {
            webhook: WebhookConfig {
                secret: Some("env:MISSION_CONTROL_TEST_WEBHOOK_SECRET".to_string()),
            },
            ..Default::default()
        };
        config.resolve_secrets().unwrap();
        assert_eq!(config.webhook.secret.as_deref(), Some("from-env"));
    }

    #[test]
    fn resolve_secrets_keeps_literals() {
        let mut config = Config {
            database: DatabaseConfig::Rest {
                url: "https://db.example.org".to_string(),
                api_key: "literal".to_string(),
                telemetry_table: default_telemetry_table(),
                devices_table: default_devices_table(),
            },
            ..Default::default()
        };
        config.resolve_secrets().unwrap();
        let DatabaseConfig::Rest { api_key, .. } = &config.database else {
            panic!("expected rest database");
        };
        assert_eq!(api_key, "literal");
    }

    #[test]
    fn resolve_secrets_missing_variable_fails() {
        let mut config = Config {
            webhook: WebhookConfig {
                secret: Some("env:MISSION_CONTROL_TEST_DEFINITELY_UNSET".to_string()),
            },
            ..Default::default()
        };
        let err = config.resolve_secrets().unwrap_err();
        assert!(err
            .to_string()
            .contains("MISSION_CONTROL_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.json"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{"server": {"port": 9100}}"#).unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn load_config_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "not json").unwrap();

        assert!(load_config(&config_path).is_err());
    }
}
