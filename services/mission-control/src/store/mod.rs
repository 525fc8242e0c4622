//! Persistence for telemetry rows and device records

mod memory;
mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::DatabaseConfig;
use crate::io::HttpClient;
use crate::model::{Device, TelemetryRow};

/// Storage backend used by the webhook, the activation flow and the dashboard
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Store: Send + Sync {
    /// Append one telemetry row
    async fn insert_telemetry(&self, row: &TelemetryRow) -> crate::Result<()>;

    /// Most recent rows across all devices, newest first
    async fn latest_telemetry(&self, limit: usize) -> crate::Result<Vec<TelemetryRow>>;

    /// The last `limit` rows of one device recorded at or before `until`,
    /// oldest first
    async fn device_path(
        &self,
        device_id: &str,
        until: Option<DateTime<Utc>>,
        limit: usize,
    ) -> crate::Result<Vec<TelemetryRow>>;

    async fn get_device(&self, id: &str) -> crate::Result<Option<Device>>;

    /// Overwrite an existing device record, `NotFound` if there is none
    async fn update_device(&self, device: &Device) -> crate::Result<()>;

    async fn list_devices(&self) -> crate::Result<Vec<Device>>;
}

/// Build the store selected in the configuration
pub fn from_config(config: &DatabaseConfig, http: Arc<dyn HttpClient>) -> Arc<dyn Store> {
    match config {
        DatabaseConfig::Memory { devices } => {
            tracing::info!("Using in-memory store with {} seeded devices", devices.len());
            Arc::new(MemoryStore::with_devices(
                devices.iter().cloned().map(Device::from),
            ))
        }
        DatabaseConfig::Rest {
            url,
            api_key,
            telemetry_table,
            devices_table,
        } => {
            tracing::info!("Using REST store at {}", url);
            Arc::new(RestStore::new(
                url,
                api_key,
                telemetry_table,
                devices_table,
                http,
            ))
        }
    }
}
