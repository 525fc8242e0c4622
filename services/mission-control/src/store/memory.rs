//! In-process store for tests, demos and offline runs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::Store;
use crate::model::{Device, TelemetryRow};
use crate::MissionControlError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    telemetry: RwLock<Vec<TelemetryRow>>,
    devices: RwLock<BTreeMap<String, Device>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let devices = devices.into_iter().map(|d| (d.id.clone(), d)).collect();
        Self {
            telemetry: RwLock::default(),
            devices: RwLock::new(devices),
        }
    }

    pub async fn add_device(&self, device: Device) {
        self.devices.write().await.insert(device.id.clone(), device);
    }

    pub async fn telemetry_count(&self) -> usize {
        self.telemetry.read().await.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_telemetry(&self, row: &TelemetryRow) -> crate::Result<()> {
        let mut telemetry = self.telemetry.write().await;
        let mut row = row.clone();
        row.id = Some(telemetry.len() as i64 + 1);
        telemetry.push(row);
        Ok(())
    }

    async fn latest_telemetry(&self, limit: usize) -> crate::Result<Vec<TelemetryRow>> {
        let telemetry = self.telemetry.read().await;
        let mut rows: Vec<TelemetryRow> = telemetry.iter().rev().cloned().collect();
        rows.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn device_path(
        &self,
        device_id: &str,
        until: Option<DateTime<Utc>>,
        limit: usize,
    ) -> crate::Result<Vec<TelemetryRow>> {
        let telemetry = self.telemetry.read().await;
        let mut rows: Vec<TelemetryRow> = telemetry
            .iter()
            .filter(|r| r.device_id == device_id)
            .filter(|r| until.is_none_or(|until| r.recorded_at <= until))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        let skip = rows.len().saturating_sub(limit);
        Ok(rows.split_off(skip))
    }

    async fn get_device(&self, id: &str) -> crate::Result<Option<Device>> {
        Ok(self.devices.read().await.get(id).cloned())
    }

    async fn update_device(&self, device: &Device) -> crate::Result<()> {
        let mut devices = self.devices.write().await;
        match devices.get_mut(&device.id) {
            Some(existing) => {
                *existing = device.clone();
                Ok(())
            }
            None => Err(MissionControlError::NotFound(format!(
                "device {}",
                device.id
            ))),
        }
    }

    async fn list_devices(&self) -> crate::Result<Vec<Device>> {
        Ok(self.devices.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceStatus;
    use chrono::Duration;

    fn base() -> DateTime<Utc> {
        "2025-06-01T12:00:00Z".parse().unwrap()
    }

    fn row(device_id: &str, minutes: i64) -> TelemetryRow {
        TelemetryRow {
            id: None,
            device_id: device_id.to_string(),
            recorded_at: base() + Duration::minutes(minutes),
            latitude: 40.0 + minutes as f64 * 0.01,
            longitude: -105.0,
            altitude_m: 10000.0,
            temperature_c: None,
            pressure_hpa: None,
            battery_v: None,
            satellites: None,
            rssi: None,
            snr: None,
        }
    }

    fn device(id: &str) -> Device {
        Device {
            id: id.to_string(),
            name: None,
            pin_hash: "hash".to_string(),
            status: DeviceStatus::Storage,
            launch: None,
            activated_at: None,
        }
    }

    #[tokio::test]
    async fn insert_assigns_ids() {
        let store = MemoryStore::new();
        store.insert_telemetry(&row("a", 0)).await.unwrap();
        store.insert_telemetry(&row("a", 1)).await.unwrap();
        assert_eq!(store.telemetry_count().await, 2);

        let latest = store.latest_telemetry(10).await.unwrap();
        assert_eq!(latest[0].id, Some(2));
        assert_eq!(latest[1].id, Some(1));
    }

    #[tokio::test]
    async fn latest_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        for (id, minutes) in [("a", 5), ("b", 1), ("a", 9), ("b", 3)] {
            store.insert_telemetry(&row(id, minutes)).await.unwrap();
        }
        let latest = store.latest_telemetry(3).await.unwrap();
        let order: Vec<_> = latest
            .iter()
            .map(|r| (r.device_id.as_str(), r.recorded_at))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a", base() + Duration::minutes(9)),
                ("a", base() + Duration::minutes(5)),
                ("b", base() + Duration::minutes(3)),
            ]
        );
    }

    #[tokio::test]
    async fn path_is_oldest_first_and_keeps_most_recent() {
        let store = MemoryStore::new();
        for minutes in [4, 1, 3, 2, 0] {
            store.insert_telemetry(&row("a", minutes)).await.unwrap();
        }
        store.insert_telemetry(&row("b", 10)).await.unwrap();

        let path = store.device_path("a", None, 3).await.unwrap();
        let minutes: Vec<i64> = path
            .iter()
            .map(|r| (r.recorded_at - base()).num_minutes())
            .collect();
        assert_eq!(minutes, vec![2, 3, 4]);

        assert!(store.device_path("missing", None, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn path_until_is_applied_before_the_limit() {
        let store = MemoryStore::new();
        for minutes in 0..10 {
            store.insert_telemetry(&row("a", minutes)).await.unwrap();
        }

        let path = store
            .device_path("a", Some(base() + Duration::minutes(3)), 5)
            .await
            .unwrap();
        let minutes: Vec<i64> = path
            .iter()
            .map(|r| (r.recorded_at - base()).num_minutes())
            .collect();
        assert_eq!(minutes, vec![0, 1, 2, 3]);

        let path = store
            .device_path("a", Some(base() + Duration::minutes(8)), 2)
            .await
            .unwrap();
        assert_eq!((path[0].recorded_at - base()).num_minutes(), 7);
        assert_eq!((path[1].recorded_at - base()).num_minutes(), 8);
    }

    #[tokio::test]
    async fn update_device_requires_existing_record() {
        let store = MemoryStore::with_devices([device("SL-001")]);
        let mut updated = device("SL-001");
        updated.status = DeviceStatus::Flying;
        store.update_device(&updated).await.unwrap();
        assert_eq!(
            store.get_device("SL-001").await.unwrap().unwrap().status,
            DeviceStatus::Flying
        );

        let err = store.update_device(&device("SL-404")).await.unwrap_err();
        assert!(matches!(err, MissionControlError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_devices_is_sorted_by_id() {
        let store = MemoryStore::new();
        store.add_device(device("SL-002")).await;
        store.add_device(device("SL-001")).await;
        let ids: Vec<String> = store
            .list_devices()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["SL-001", "SL-002"]);
    }
}
