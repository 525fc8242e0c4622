//! BDD step definitions for the activation feature

use cucumber::{given, then, when};
use mission_control::activation::hash_pin;
use mission_control::model::{Device, DeviceStatus};
use mission_control::store::Store;
use serde_json::json;

use crate::world::MissionControlWorld;

fn parse_status(s: &str) -> DeviceStatus {
    match s {
        "storage" => DeviceStatus::Storage,
        "flying" => DeviceStatus::Flying,
        "landed" => DeviceStatus::Landed,
        "retired" => DeviceStatus::Retired,
        other => panic!("Unknown status: {}", other),
    }
}

fn session_uri(world: &MissionControlWorld, action: &str) -> String {
    let id = world.session_id.as_ref().expect("no activation session");
    format!("/api/activation/sessions/{}/{}", id, action)
}

#[given(expr = "a device {string} in {string} with PIN {string}")]
async fn device_with_pin(world: &mut MissionControlWorld, id: String, status: String, pin: String) {
    let device = Device {
        id,
        name: None,
        pin_hash: hash_pin(&pin).unwrap(),
        status: parse_status(&status),
        launch: None,
        activated_at: None,
    };
    world.store().add_device(device).await;
}

#[when(expr = "the operator starts activation for {string} with PIN {string}")]
async fn start_activation(world: &mut MissionControlWorld, device_id: String, pin: String) {
    world
        .post_json(
            "/api/activation/sessions",
            json!({ "device_id": device_id, "pin": pin }),
        )
        .await;
    if world.response_status == Some(201) {
        let id = world.json()["id"].as_str().map(str::to_string);
        world.session_id = id;
    }
}

#[when("the operator confirms the hardware checklist")]
async fn confirm_hardware(world: &mut MissionControlWorld) {
    let uri = session_uri(world, "hardware");
    world
        .post_json(
            &uri,
            json!({
                "antenna_attached": true,
                "battery_charged": true,
                "gps_sky_view": true,
                "payload_sealed": true
            }),
        )
        .await;
}

#[when("the operator confirms the checklist without sealing the payload")]
async fn confirm_hardware_unsealed(world: &mut MissionControlWorld) {
    let uri = session_uri(world, "hardware");
    world
        .post_json(
            &uri,
            json!({
                "antenna_attached": true,
                "battery_charged": true,
                "gps_sky_view": true
            }),
        )
        .await;
}

#[when(expr = "the operator locks the location {float}, {float} with accuracy {float}")]
async fn lock_location(world: &mut MissionControlWorld, lat: f64, lon: f64, accuracy: f64) {
    let uri = session_uri(world, "location");
    world
        .post_json(
            &uri,
            json!({ "latitude": lat, "longitude": lon, "accuracy_m": accuracy }),
        )
        .await;
}

#[when(expr = "the operator holds the launch button for {int} ms")]
async fn hold_button(world: &mut MissionControlWorld, held_ms: u64) {
    let uri = session_uri(world, "confirm");
    world.post_json(&uri, json!({ "held_ms": held_ms })).await;
}

#[when("the operator goes back")]
async fn go_back(world: &mut MissionControlWorld) {
    let uri = session_uri(world, "back");
    world.post_json(&uri, json!({})).await;
}

#[when(expr = "the operator activates {string} directly with PIN {string} at {float}, {float}")]
async fn activate_directly(
    world: &mut MissionControlWorld,
    device_id: String,
    pin: String,
    lat: f64,
    lon: f64,
) {
    world
        .post_json(
            "/api/activate",
            json!({ "device_id": device_id, "pin": pin, "latitude": lat, "longitude": lon }),
        )
        .await;
}

#[when(expr = "the operator activates {string} with PIN {string} but no location")]
async fn activate_without_location(
    world: &mut MissionControlWorld,
    device_id: String,
    pin: String,
) {
    world
        .post_json(
            "/api/activate",
            json!({ "device_id": device_id, "pin": pin }),
        )
        .await;
}

#[when(expr = "the operator re-enters PIN {string}")]
async fn reenter_pin(world: &mut MissionControlWorld, pin: String) {
    let uri = session_uri(world, "credentials");
    world.post_json(&uri, json!({ "pin": pin })).await;
}

#[then(expr = "the wizard should be at step {string}")]
fn wizard_step(world: &mut MissionControlWorld, expected_step: String) {
    let json = world.json();
    assert_eq!(json["step"], expected_step, "response: {json}");
}

#[then(expr = "device {string} should be {string}")]
async fn device_status(world: &mut MissionControlWorld, id: String, status: String) {
    let device = world
        .store()
        .get_device(&id)
        .await
        .unwrap()
        .expect("device not found");
    assert_eq!(device.status, parse_status(&status));
}

#[then(expr = "device {string} should have launched from {float}, {float}")]
async fn device_launch_site(world: &mut MissionControlWorld, id: String, lat: f64, lon: f64) {
    let device = world
        .store()
        .get_device(&id)
        .await
        .unwrap()
        .expect("device not found");
    let launch = device.launch.expect("no launch info");
    assert!((launch.latitude - lat).abs() < 1e-9);
    assert!((launch.longitude - lon).abs() < 1e-9);
    assert!(device.activated_at.is_some());
}

#[then("the response should not expose the PIN hash")]
fn no_pin_hash(world: &mut MissionControlWorld) {
    let body = world.response_body.as_ref().expect("no response body");
    assert!(!body.contains("pin_hash"), "{body}");
    assert!(!body.contains("$argon2"), "{body}");
}
