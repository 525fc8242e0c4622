//! Shared state for the fleet snapshot and the HTTP handlers

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::activation::ActivationSessions;
use crate::config::Config;
use crate::model::{Device, DeviceStatus, TelemetryRow};
use crate::store::Store;

/// Newest known position of one balloon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalloonStatus {
    pub device_id: String,
    pub name: String,
    pub status: Option<DeviceStatus>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    pub recorded_at: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    pub battery_v: Option<f64>,
    pub rssi: Option<f64>,
}

/// Result of one successful poll
#[derive(Debug, Clone, Default, Serialize)]
pub struct FleetSnapshot {
    pub balloons: Vec<BalloonStatus>,
    pub taken_at: Option<DateTime<Utc>>,
}

/// Reduce rows to the newest fix per device, sorted by device id.
///
/// Devices without a record still appear, with no status.
pub fn reduce_latest(rows: &[TelemetryRow], devices: &[Device]) -> Vec<BalloonStatus> {
    let mut newest: HashMap<&str, &TelemetryRow> = HashMap::new();
    for row in rows {
        newest
            .entry(row.device_id.as_str())
            .and_modify(|current| {
                if row.recorded_at > current.recorded_at {
                    *current = row;
                }
            })
            .or_insert(row);
    }

    let mut balloons: Vec<BalloonStatus> = newest
        .into_values()
        .map(|row| {
            let device = devices.iter().find(|d| d.id == row.device_id);
            BalloonStatus {
                device_id: row.device_id.clone(),
                name: device
                    .map(|d| d.display_name().to_string())
                    .unwrap_or_else(|| row.device_id.clone()),
                status: device.map(|d| d.status),
                latitude: row.latitude,
                longitude: row.longitude,
                altitude_m: row.altitude_m,
                recorded_at: row.recorded_at,
                temperature_c: row.temperature_c,
                battery_v: row.battery_v,
                rssi: row.rssi,
            }
        })
        .collect();
    balloons.sort_by(|a, b| a.device_id.cmp(&b.device_id));
    balloons
}

/// Poller bookkeeping read by the dashboard
#[derive(Debug)]
pub struct SharedState {
    pub snapshot: FleetSnapshot,
    pub consecutive_errors: u32,
    pub last_error: Option<String>,
    pub last_poll: Option<DateTime<Utc>>,
    pub polls: u64,
    pub poll_interval: Duration,
    pub started_at: Instant,
}

impl SharedState {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            snapshot: FleetSnapshot::default(),
            consecutive_errors: 0,
            last_error: None,
            last_poll: None,
            polls: 0,
            poll_interval,
            started_at: Instant::now(),
        }
    }

    pub fn record_success(&mut self, snapshot: FleetSnapshot, now: DateTime<Utc>) {
        self.snapshot = snapshot;
        self.consecutive_errors = 0;
        self.last_error = None;
        self.last_poll = Some(now);
        self.polls += 1;
    }

    /// Keep the previous snapshot, returning the new error count
    pub fn record_failure(&mut self, error: String, now: DateTime<Utc>) -> u32 {
        self.consecutive_errors += 1;
        self.last_error = Some(error);
        self.last_poll = Some(now);
        self.polls += 1;
        self.consecutive_errors
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle(poll_interval: Duration) -> StateHandle {
    Arc::new(RwLock::new(SharedState::new(poll_interval)))
}

/// Everything a request handler needs
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub fleet: StateHandle,
    pub sessions: Arc<ActivationSessions>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let fleet = new_state_handle(config.dashboard.poll_interval);
        let sessions = Arc::new(ActivationSessions::new(config.activation.clone()));
        Self {
            store,
            config: Arc::new(config),
            fleet,
            sessions,
        }
    }
}
