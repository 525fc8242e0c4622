//! Steps shared by every feature

use cucumber::{given, then, when};
use mission_control::config::Config;

use crate::world::MissionControlWorld;

#[given("a mission control server")]
fn server(world: &mut MissionControlWorld) {
    world.start(Config::default());
}

#[given(expr = "a mission control server with webhook secret {string}")]
fn server_with_secret(world: &mut MissionControlWorld, secret: String) {
    let mut config = Config::default();
    config.webhook.secret = Some(secret);
    world.start(config);
}

#[when(expr = "the page {string} is requested")]
async fn page_requested(world: &mut MissionControlWorld, uri: String) {
    world.get(&uri).await;
}

#[then(expr = "the response status should be {int}")]
fn response_status(world: &mut MissionControlWorld, expected: u16) {
    assert_eq!(
        world.response_status,
        Some(expected),
        "response body: {:?}",
        world.response_body
    );
}

#[then(expr = "the response should contain {string}")]
fn response_contains(world: &mut MissionControlWorld, expected: String) {
    let body = world.response_body.as_ref().expect("no response body");
    assert!(
        body.contains(&expected),
        "Expected response to contain '{}', but it didn't.\nResponse body:\n{}",
        expected,
        body
    );
}

#[then(expr = "the response field {string} should be {string}")]
fn response_field(world: &mut MissionControlWorld, field: String, expected: String) {
    let json = world.json();
    assert_eq!(json[&field], expected, "response: {json}");
}

#[then(expr = "the response should be a JSON error mentioning {string}")]
fn json_error(world: &mut MissionControlWorld, text: String) {
    let json = world.json();
    let error = json["error"].as_str().expect("no error field");
    assert!(error.contains(&text), "error {:?} lacks {:?}", error, text);
}
