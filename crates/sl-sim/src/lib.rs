//! Stratospheric balloon simulation
//!
//! Moves balloons through gridded wind data one hour at a time, tracks the
//! ground area their radios can reach, and exports tracks as GeoJSON. Also
//! hosts the seeded wind-particle animation used on the website.

pub mod balloon;
pub mod constants;
pub mod coordinates;
pub mod coverage;
pub mod demo;
pub mod error;
pub mod export;
pub mod fleet;
pub mod trajectory;
pub mod wind;

pub use balloon::{Balloon, TrackPoint, TrajectoryRecord};
pub use coverage::{CoverageAnalyzer, CoverageStats};
pub use demo::{DemoFrame, DemoSettings, ParticleDemo};
pub use error::{Result, SimError};
pub use export::{fleet_to_geojson, write_geojson, TrackStyle};
pub use fleet::Fleet;
pub use trajectory::{TrajectoryComputer, TrajectoryPoint};
pub use wind::{Interpolation, SyntheticWind, WindField, WindSource};
