//! Fleets of balloons simulated together

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::balloon::{Balloon, TrajectoryRecord};
use crate::coverage::CoverageAnalyzer;
use crate::error::{Result, SimError};
use crate::wind::WindSource;

/// A collection of balloons
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    balloons: Vec<Balloon>,
    simulated: bool,
}

fn balloon_id(index: usize) -> String {
    format!("B{:03}", index)
}

impl Fleet {
    pub fn new(balloons: Vec<Balloon>) -> Self {
        Self {
            balloons,
            simulated: false,
        }
    }

    pub fn add_balloon(&mut self, balloon: Balloon) -> &mut Self {
        self.balloons.push(balloon);
        self
    }

    /// Uniformly random launch positions within the given ranges.
    ///
    /// The same seed always yields the same fleet; without a seed the
    /// generator is seeded from OS entropy.
    pub fn create_random(
        count: usize,
        lat_range: (f64, f64),
        lon_range: (f64, f64),
        seed: Option<u64>,
    ) -> Self {
        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let balloons = (0..count)
            .map(|i| {
                let lat = sample(&mut rng, lat_range);
                let lon = sample(&mut rng, lon_range);
                Balloon::new(lat, lon).with_id(balloon_id(i))
            })
            .collect();
        Self::new(balloons)
    }

    /// Balloons on a regular grid, both ranges inclusive
    pub fn create_grid(
        lat_range: (f64, f64),
        lon_range: (f64, f64),
        lat_spacing: f64,
        lon_spacing: f64,
    ) -> Result<Self> {
        if lat_spacing <= 0.0 || lon_spacing <= 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "grid spacing must be positive, got {} x {}",
                lat_spacing, lon_spacing
            )));
        }

        let mut balloons = Vec::new();
        let mut lat = lat_range.0;
        while lat <= lat_range.1 {
            let mut lon = lon_range.0;
            while lon <= lon_range.1 {
                balloons.push(Balloon::new(lat, lon).with_id(balloon_id(balloons.len())));
                lon += lon_spacing;
            }
            lat += lat_spacing;
        }
        Ok(Self::new(balloons))
    }

    /// Simulate every balloon; `start_hours`, when given, must hold one entry
    /// per balloon
    pub fn simulate<W: WindSource + ?Sized>(
        &mut self,
        wind: &W,
        num_steps: u32,
        start_hours: Option<&[u32]>,
    ) -> Result<&mut Self> {
        if let Some(hours) = start_hours {
            if hours.len() != self.balloons.len() {
                return Err(SimError::InvalidArgument(format!(
                    "start_hours length ({}) must match number of balloons ({})",
                    hours.len(),
                    self.balloons.len()
                )));
            }
        }

        for (i, balloon) in self.balloons.iter_mut().enumerate() {
            let start = start_hours.map(|h| h[i]).unwrap_or(0);
            balloon.simulate(wind, num_steps, start);
        }

        tracing::debug!(
            "Simulated fleet of {} balloons for {} steps",
            self.balloons.len(),
            num_steps
        );
        self.simulated = true;
        Ok(self)
    }

    /// All trajectory records of all balloons
    pub fn records(&self) -> Result<Vec<TrajectoryRecord>> {
        if !self.simulated {
            return Err(SimError::NotSimulated("Fleet"));
        }
        let mut records = Vec::new();
        for balloon in &self.balloons {
            records.extend(balloon.records()?);
        }
        Ok(records)
    }

    /// Coverage at one time step, or cumulative over all steps (cells are
    /// marked with the step index that last covered them)
    pub fn compute_coverage(
        &self,
        analyzer: &CoverageAnalyzer,
        time_step: Option<usize>,
    ) -> Result<Array2<f64>> {
        if !self.simulated {
            return Err(SimError::NotSimulated("Fleet"));
        }

        let mut grid = analyzer.create_grid();
        for balloon in &self.balloons {
            let track = balloon.track()?;
            match time_step {
                Some(step) => {
                    if let Some(point) = track.get(step) {
                        analyzer.update_coverage(point.lat, point.lon, &mut grid, step as f64);
                    }
                }
                None => {
                    for (step, point) in track.iter().enumerate() {
                        analyzer.update_coverage(point.lat, point.lon, &mut grid, step as f64);
                    }
                }
            }
        }
        Ok(grid)
    }

    pub fn balloons(&self) -> &[Balloon] {
        &self.balloons
    }

    pub fn len(&self) -> usize {
        self.balloons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balloons.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Balloon> {
        self.balloons.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Balloon> {
        self.balloons.get(index)
    }
}

impl<'a> IntoIterator for &'a Fleet {
    type Item = &'a Balloon;
    type IntoIter = std::slice::Iter<'a, Balloon>;

    fn into_iter(self) -> Self::IntoIter {
        self.balloons.iter()
    }
}

impl std::ops::Index<usize> for Fleet {
    type Output = Balloon;

    fn index(&self, index: usize) -> &Balloon {
        &self.balloons[index]
    }
}

fn sample(rng: &mut ChaCha8Rng, (low, high): (f64, f64)) -> f64 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}
