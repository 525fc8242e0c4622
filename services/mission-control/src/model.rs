//! Records shared between the store, the webhook and the dashboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a physical tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Storage,
    Flying,
    Landed,
    Retired,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceStatus::Storage => write!(f, "storage"),
            DeviceStatus::Flying => write!(f, "flying"),
            DeviceStatus::Landed => write!(f, "landed"),
            DeviceStatus::Retired => write!(f, "retired"),
        }
    }
}

/// Where and when a balloon was launched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchInfo {
    pub latitude: f64,
    pub longitude: f64,
    pub launched_at: DateTime<Utc>,
}

/// Provisioning entry for one tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Argon2 PHC string of the activation PIN
    pub pin_hash: String,
    pub status: DeviceStatus,
    #[serde(default)]
    pub launch: Option<LaunchInfo>,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
}

impl Device {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// One recorded observation of a balloon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub device_id: String,
    pub recorded_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub pressure_hpa: Option<f64>,
    #[serde(default)]
    pub battery_v: Option<f64>,
    #[serde(default)]
    pub satellites: Option<u8>,
    #[serde(default)]
    pub rssi: Option<f64>,
    #[serde(default)]
    pub snr: Option<f64>,
}
