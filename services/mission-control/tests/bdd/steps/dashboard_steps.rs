//! BDD step definitions for the dashboard feature

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cucumber::{given, then, when};
use mission_control::model::TelemetryRow;
use mission_control::poller::Poller;
use mission_control::store::Store;
use tokio_util::sync::CancellationToken;

use crate::world::MissionControlWorld;

fn launch_time() -> DateTime<Utc> {
    "2025-06-01T12:00:00Z".parse().unwrap()
}

#[given(expr = "telemetry for {string} at minutes {int}, {int} and {int}")]
async fn telemetry_at(world: &mut MissionControlWorld, device_id: String, a: i64, b: i64, c: i64) {
    for minutes in [a, b, c] {
        let row = TelemetryRow {
            id: None,
            device_id: device_id.clone(),
            recorded_at: launch_time() + chrono::Duration::minutes(minutes),
            latitude: 40.0 + minutes as f64 * 0.01,
            longitude: -105.0 + minutes as f64 * 0.02,
            altitude_m: minutes as f64 * 100.0,
            temperature_c: None,
            pressure_hpa: None,
            battery_v: None,
            satellites: None,
            rssi: Some(-100.0 - minutes as f64),
            snr: None,
        };
        world.store().insert_telemetry(&row).await.unwrap();
    }
}

#[when("the fleet is polled")]
async fn fleet_polled(world: &mut MissionControlWorld) {
    let app = world.app();
    let poller = Poller::new(
        Arc::clone(&app.store),
        Arc::clone(&app.fleet),
        Duration::from_secs(30),
        app.config.dashboard.latest_limit,
        CancellationToken::new(),
    );
    poller.poll_once().await.unwrap();
}

#[then(expr = "balloon {string} should be reported at altitude {float}")]
fn balloon_altitude(world: &mut MissionControlWorld, device_id: String, altitude: f64) {
    let json = world.json();
    let balloons = json["balloons"].as_array().expect("no balloons array");
    let balloon = balloons
        .iter()
        .find(|b| b["device_id"] == device_id)
        .unwrap_or_else(|| panic!("balloon {} not reported: {}", device_id, json));
    assert_eq!(balloon["altitude_m"].as_f64(), Some(altitude));
}

#[then(expr = "{int} balloon(s) should be reported")]
fn balloon_count(world: &mut MissionControlWorld, count: usize) {
    let json = world.json();
    assert_eq!(json["balloons"].as_array().map(Vec::len), Some(count));
}

#[then(expr = "the path should have {int} points in time order")]
fn path_in_order(world: &mut MissionControlWorld, count: usize) {
    let json = world.json();
    let points = json["points"].as_array().expect("no points array");
    assert_eq!(points.len(), count);
    let times: Vec<DateTime<Utc>> = points
        .iter()
        .map(|p| p["recorded_at"].as_str().unwrap().parse().unwrap())
        .collect();
    assert!(times.windows(2).all(|w| w[0] < w[1]), "{times:?}");
    assert_eq!(
        json["line"]["coordinates"].as_array().map(Vec::len),
        Some(count)
    );
}
