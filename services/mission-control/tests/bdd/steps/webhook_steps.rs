//! BDD step definitions for the webhook feature

use axum::body::Body;
use axum::http::Request;
use cucumber::{then, when};
use mission_control::store::Store;
use mission_control::ttn::UplinkMessage;
use mission_control::uplink::{self, SensorReadings, UplinkFrame};

use crate::world::MissionControlWorld;

fn uplink_request(body: String, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhook/lorawan")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("X-Webhook-Secret", secret);
    }
    builder.body(Body::from(body)).unwrap()
}

fn message(device_id: &str, latitude: f64, longitude: f64) -> String {
    let frame = UplinkFrame {
        latitude,
        longitude,
        altitude_m: 12000.0,
        sensors: Some(SensorReadings {
            temperature_c: -48.0,
            pressure_hpa: 195.0,
            battery_v: 3.9,
            satellites: 10,
        }),
    };
    let payload = uplink::encode(&frame).unwrap();
    let message = UplinkMessage::from_frame(device_id, &payload, chrono::Utc::now());
    serde_json::to_string(&message).unwrap()
}

#[when(expr = "the network server posts an uplink for {string} at latitude {float} and longitude {float}")]
async fn post_uplink(world: &mut MissionControlWorld, device_id: String, lat: f64, lon: f64) {
    let request = uplink_request(message(&device_id, lat, lon), None);
    world.send(request).await;
}

#[when(expr = "the network server posts an uplink for {string} with secret {string}")]
async fn post_uplink_with_secret(world: &mut MissionControlWorld, device_id: String, secret: String) {
    let request = uplink_request(message(&device_id, 40.0, -105.0), Some(&secret));
    world.send(request).await;
}

#[when(expr = "the network server posts a {int} byte payload for {string}")]
async fn post_short_payload(world: &mut MissionControlWorld, length: usize, device_id: String) {
    let message = UplinkMessage::from_frame(device_id, &vec![0u8; length], chrono::Utc::now());
    let request = uplink_request(serde_json::to_string(&message).unwrap(), None);
    world.send(request).await;
}

#[when("the network server posts a body that is not JSON")]
async fn post_garbage(world: &mut MissionControlWorld) {
    let request = uplink_request("uplink_message=oops".to_string(), None);
    world.send(request).await;
}

#[then(expr = "{int} telemetry row(s) should be stored for {string}")]
async fn rows_stored(world: &mut MissionControlWorld, count: usize, device_id: String) {
    let rows = world.store().device_path(&device_id, None, 100).await.unwrap();
    assert_eq!(rows.len(), count);
}

#[then(expr = "the stored fix for {string} should be at latitude {float}")]
async fn stored_latitude(world: &mut MissionControlWorld, device_id: String, latitude: f64) {
    let rows = world.store().device_path(&device_id, None, 1).await.unwrap();
    let row = rows.last().expect("no rows stored");
    assert!(
        (row.latitude - latitude).abs() < 1e-6,
        "stored latitude {} != {}",
        row.latitude,
        latitude
    );
    assert_eq!(row.satellites, Some(10));
}
