//! Wind-driven trajectory integration
//!
//! Simple Euler integration where the balloon instantly adopts the wind
//! velocity, stepping one hour at a time. Positions crossing a pole are
//! reflected back and their longitude flipped by 180 degrees.

use serde::{Deserialize, Serialize};

use crate::constants::KM_PER_DEGREE_LAT;
use crate::coordinates::{internal_to_standard, km_per_degree_lon_internal, standard_to_internal};
use crate::wind::WindSource;

/// Lower bound on the longitudinal degree length, keeps exact poles finite
const MIN_KM_PER_DEGREE_LON: f64 = 1e-6;

/// A single trajectory point in standard coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub lat: f64,
    pub lon: f64,
    pub hour: u32,
}

/// Integrates balloon positions through a wind source
pub struct TrajectoryComputer<'a, W: WindSource + ?Sized> {
    wind: &'a W,
}

impl<'a, W: WindSource + ?Sized> TrajectoryComputer<'a, W> {
    pub fn new(wind: &'a W) -> Self {
        Self { wind }
    }

    /// Advance one hour from a standard-coordinate position
    pub fn compute_step(&self, lat: f64, lon: f64, hour: u32) -> (f64, f64) {
        let (lat, lon) = standard_to_internal(lat, lon);
        let (u_kmh, v_kmh) = self.wind.wind_internal(lat, lon, hour);

        let d_lat = v_kmh / KM_PER_DEGREE_LAT;
        let d_lon = u_kmh / km_per_degree_lon_internal(lat).max(MIN_KM_PER_DEGREE_LON);

        let mut new_lat = lat + d_lat;
        let mut new_lon = lon + d_lon;

        if new_lat > 180.0 {
            new_lat = 180.0 - new_lat % 180.0;
            new_lon = (new_lon + 180.0).rem_euclid(360.0);
        } else if new_lat < 0.0 {
            new_lat = new_lat.abs();
            new_lon = (new_lon + 180.0).rem_euclid(360.0);
        } else {
            new_lon = new_lon.rem_euclid(360.0);
        }

        internal_to_standard(new_lat, new_lon)
    }

    /// Compute `num_steps` hourly steps, returning `num_steps + 1` points
    pub fn compute_trajectory(
        &self,
        lat: f64,
        lon: f64,
        num_steps: u32,
        start_hour: u32,
    ) -> Vec<TrajectoryPoint> {
        let mut points = Vec::with_capacity(num_steps as usize + 1);
        points.push(TrajectoryPoint {
            lat,
            lon,
            hour: start_hour,
        });

        let (mut lat, mut lon) = (lat, lon);
        for i in 0..num_steps {
            let hour = start_hour + i;
            (lat, lon) = self.compute_step(lat, lon, hour);
            points.push(TrajectoryPoint {
                lat,
                lon,
                hour: hour + 1,
            });
        }
        points
    }

    /// Same as [`compute_trajectory`](Self::compute_trajectory), as separate
    /// latitude and longitude vectors
    pub fn compute_trajectory_arrays(
        &self,
        lat: f64,
        lon: f64,
        num_steps: u32,
        start_hour: u32,
    ) -> (Vec<f64>, Vec<f64>) {
        self.compute_trajectory(lat, lon, num_steps, start_hour)
            .into_iter()
            .map(|p| (p.lat, p.lon))
            .unzip()
    }
}
