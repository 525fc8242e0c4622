//! BDD step definitions for mission control

pub mod activation_steps;
pub mod common_steps;
pub mod dashboard_steps;
pub mod webhook_steps;
