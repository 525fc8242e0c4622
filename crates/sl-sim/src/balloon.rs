//! A single simulated balloon

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::WIND_UPDATE_HOURS;
use crate::error::{Result, SimError};
use crate::trajectory::TrajectoryComputer;
use crate::wind::WindSource;

/// One point of a simulated track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub hour: u32,
    /// Wall-clock time, when the wind data covers the simulated window
    pub time: Option<DateTime<Utc>>,
}

/// Flat record of one track point, tagged with its balloon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub lat: f64,
    pub lon: f64,
    pub hour: u32,
    pub time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balloon_id: Option<String>,
}

/// A stratospheric balloon with a launch position and, once simulated, a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balloon {
    pub lat: f64,
    pub lon: f64,
    pub id: Option<String>,
    #[serde(default)]
    track: Option<Vec<TrackPoint>>,
}

impl Balloon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            id: None,
            track: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Simulate `num_steps` hours starting at `start_hour` of the wind data
    pub fn simulate<W: WindSource + ?Sized>(
        &mut self,
        wind: &W,
        num_steps: u32,
        start_hour: u32,
    ) -> &mut Self {
        let points = TrajectoryComputer::new(wind).compute_trajectory(
            self.lat, self.lon, num_steps, start_hour,
        );

        let times = wind.times();
        let covered =
            ((start_hour + num_steps) as usize) < times.len() * WIND_UPDATE_HOURS as usize;

        let track = points
            .into_iter()
            .map(|p| {
                let time = if covered {
                    let index = (p.hour / WIND_UPDATE_HOURS) as usize;
                    times.get(index.min(times.len() - 1)).copied()
                } else {
                    None
                };
                TrackPoint {
                    lat: p.lat,
                    lon: p.lon,
                    hour: p.hour,
                    time,
                }
            })
            .collect();

        tracing::debug!(
            "Simulated balloon {} for {} steps from hour {}",
            self.id.as_deref().unwrap_or("<unnamed>"),
            num_steps,
            start_hour
        );

        self.track = Some(track);
        self
    }

    pub fn is_simulated(&self) -> bool {
        self.track.is_some()
    }

    /// The simulated track
    pub fn track(&self) -> Result<&[TrackPoint]> {
        self.track
            .as_deref()
            .ok_or(SimError::NotSimulated("Balloon"))
    }

    /// The simulated track as `(lat, lon)` pairs
    pub fn trajectory(&self) -> Result<Vec<(f64, f64)>> {
        Ok(self.track()?.iter().map(|p| (p.lat, p.lon)).collect())
    }

    /// The simulated track as flat records
    pub fn records(&self) -> Result<Vec<TrajectoryRecord>> {
        Ok(self
            .track()?
            .iter()
            .map(|p| TrajectoryRecord {
                lat: p.lat,
                lon: p.lon,
                hour: p.hour,
                time: p.time,
                balloon_id: self.id.clone(),
            })
            .collect())
    }
}
