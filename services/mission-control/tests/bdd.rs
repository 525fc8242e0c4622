//! BDD test entry point for mission control

#[path = "bdd/world.rs"]
mod world;

#[path = "bdd/steps/mod.rs"]
mod steps;

use cucumber::World as _;
use world::MissionControlWorld;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    MissionControlWorld::run("tests/features").await;
}
