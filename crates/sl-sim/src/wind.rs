//! Wind field loading, generation and lookup
//!
//! A [`WindField`] holds the U (east-west) and V (north-south) wind
//! components at a single pressure level as `time x lat x lon` arrays, with
//! latitude index 0 at the south pole. Lookups return km/h.

use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::{concatenate, Array3, Array4, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_PRESSURE_LEVEL, MS_TO_KMH, REANALYSIS_GRID_HEIGHT, REANALYSIS_GRID_WIDTH,
    WIND_UPDATE_HOURS,
};
use crate::coordinates::{grid_to_standard, internal_to_grid, standard_to_internal};
use crate::error::{Result, SimError};

/// Anything that can answer "what is the wind here, at this hour"
pub trait WindSource {
    /// Wind `(u, v)` in km/h at an internal-coordinate position
    fn wind_internal(&self, lat: f64, lon: f64, hour: u32) -> (f64, f64);

    /// Wall-clock time of each wind time step, if known
    fn times(&self) -> &[DateTime<Utc>] {
        &[]
    }
}

/// Temporal interpolation between wind time steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Hold each time step for its full 6 hours
    #[default]
    Step,
    /// Blend linearly between adjacent time steps
    Linear,
}

/// Parameters for a seeded synthetic wind field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticWind {
    pub seed: u64,
    pub grid_height: usize,
    pub grid_width: usize,
    pub num_times: usize,
    /// Peak speed of the mid-latitude westerly jets
    pub jet_speed_ms: f64,
    /// Amplitude of the random perturbations
    pub turbulence_ms: f64,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
}

impl Default for SyntheticWind {
    fn default() -> Self {
        Self {
            seed: 42,
            grid_height: REANALYSIS_GRID_HEIGHT,
            grid_width: REANALYSIS_GRID_WIDTH,
            num_times: 8,
            jet_speed_ms: 35.0,
            turbulence_ms: 8.0,
            start: None,
        }
    }
}

/// One wind component file: `data[time][level][lat][lon]` in m/s
#[derive(Debug, Deserialize)]
struct WindFile {
    times: Vec<DateTime<Utc>>,
    levels: Vec<u32>,
    /// Reanalysis files run north to south
    #[serde(default = "default_true")]
    latitude_descending: bool,
    data: Vec<Vec<Vec<Vec<f64>>>>,
}

fn default_true() -> bool {
    true
}

/// Gridded wind data at one pressure level
#[derive(Debug, Clone)]
pub struct WindField {
    u: Array3<f64>,
    v: Array3<f64>,
    times: Vec<DateTime<Utc>>,
    pressure_level: u32,
    interpolation: Interpolation,
}

impl WindField {
    /// Build a wind field from U/V arrays shaped `(time, lat, lon)` in m/s
    pub fn new(
        u: Array3<f64>,
        v: Array3<f64>,
        times: Vec<DateTime<Utc>>,
        pressure_level: u32,
        interpolation: Interpolation,
    ) -> Result<Self> {
        if u.shape() != v.shape() {
            return Err(SimError::WindData(format!(
                "U shape {:?} does not match V shape {:?}",
                u.shape(),
                v.shape()
            )));
        }
        if u.is_empty() {
            return Err(SimError::WindData("wind arrays are empty".to_string()));
        }
        if !times.is_empty() && times.len() != u.shape()[0] {
            return Err(SimError::WindData(format!(
                "{} time stamps for {} time steps",
                times.len(),
                u.shape()[0]
            )));
        }
        Ok(Self {
            u,
            v,
            times,
            pressure_level,
            interpolation,
        })
    }

    /// A constant wind everywhere, mostly useful for tests and demos
    pub fn uniform(
        u_ms: f64,
        v_ms: f64,
        grid_height: usize,
        grid_width: usize,
        num_times: usize,
    ) -> Self {
        let shape = (num_times.max(1), grid_height.max(1), grid_width.max(1));
        Self {
            u: Array3::from_elem(shape, u_ms),
            v: Array3::from_elem(shape, v_ms),
            times: Vec::new(),
            pressure_level: DEFAULT_PRESSURE_LEVEL,
            interpolation: Interpolation::Step,
        }
    }

    /// Load every `uwnd*.json` / `vwnd*.json` file in a directory.
    ///
    /// Files are concatenated along time in name order, the requested
    /// pressure level is selected, and latitude is flipped to run south to
    /// north when the file says it runs north to south.
    pub fn load_dir(
        dir: &Path,
        pressure_level: u32,
        interpolation: Interpolation,
    ) -> Result<Self> {
        let mut u_files = Vec::new();
        let mut v_files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".json") {
                continue;
            }
            if name.contains("uwnd") {
                u_files.push(path.clone());
            } else if name.contains("vwnd") {
                v_files.push(path.clone());
            }
        }
        u_files.sort();
        v_files.sort();

        if u_files.is_empty() || v_files.is_empty() {
            return Err(SimError::WindData(format!(
                "no wind data files found in {:?}, expected uwnd*.json and vwnd*.json",
                dir
            )));
        }

        tracing::debug!(
            "Loading {} U and {} V wind files from {:?} at {} hPa",
            u_files.len(),
            v_files.len(),
            dir,
            pressure_level
        );

        let (u, times) = load_component(&u_files, pressure_level)?;
        let (v, _) = load_component(&v_files, pressure_level)?;
        Self::new(u, v, times, pressure_level, interpolation)
    }

    /// Generate a seeded synthetic wind field.
    ///
    /// Zonal jets peak around 45 degrees north and south with weak easterlies
    /// at the equator; smoothed random perturbations drift between time steps.
    pub fn synthetic(params: &SyntheticWind) -> Self {
        let (nt, h, w) = (
            params.num_times.max(1),
            params.grid_height.max(2),
            params.grid_width.max(1),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut u = Array3::zeros((nt, h, w));
        let mut v = Array3::zeros((nt, h, w));

        let mut noise_u = smoothed_noise(&mut rng, h, w, params.turbulence_ms);
        let mut noise_v = smoothed_noise(&mut rng, h, w, params.turbulence_ms);

        for t in 0..nt {
            if t > 0 {
                let fresh_u = smoothed_noise(&mut rng, h, w, params.turbulence_ms);
                let fresh_v = smoothed_noise(&mut rng, h, w, params.turbulence_ms);
                noise_u = noise_u * 0.7 + fresh_u * 0.3;
                noise_v = noise_v * 0.7 + fresh_v * 0.3;
            }
            for y in 0..h {
                let (lat, _) = grid_to_standard(y, 0, h, w);
                let jet = (-((lat.abs() - 45.0) / 12.0).powi(2)).exp();
                let trades = (-(lat / 15.0).powi(2)).exp();
                let zonal = params.jet_speed_ms * (jet - 0.3 * trades);
                for x in 0..w {
                    u[[t, y, x]] = zonal + noise_u[[y, x]];
                    v[[t, y, x]] = 0.5 * noise_v[[y, x]];
                }
            }
        }

        let times = params
            .start
            .map(|start| {
                (0..nt)
                    .map(|i| start + chrono::Duration::hours((i as u32 * WIND_UPDATE_HOURS) as i64))
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(
            "Generated synthetic wind field {}x{}x{} (seed {})",
            nt,
            h,
            w,
            params.seed
        );

        Self {
            u,
            v,
            times,
            pressure_level: DEFAULT_PRESSURE_LEVEL,
            interpolation: Interpolation::Step,
        }
    }

    /// Switch the temporal interpolation mode
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn grid_height(&self) -> usize {
        self.u.shape()[1]
    }

    pub fn grid_width(&self) -> usize {
        self.u.shape()[2]
    }

    pub fn num_times(&self) -> usize {
        self.u.shape()[0]
    }

    pub fn pressure_level(&self) -> u32 {
        self.pressure_level
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Raw wind in m/s at grid cell `(y, x)` of time step `t`
    pub fn cell_ms(&self, t: usize, y: usize, x: usize) -> (f64, f64) {
        let t = t.min(self.num_times() - 1);
        (self.u[[t, y, x]], self.v[[t, y, x]])
    }

    /// Wind `(u, v)` in km/h at a standard-coordinate position
    pub fn wind(&self, lat: f64, lon: f64, hour: u32) -> (f64, f64) {
        let (lat, lon) = standard_to_internal(lat, lon);
        self.wind_internal(lat, lon, hour)
    }

    fn sample_ms(&self, hour: u32, y: usize, x: usize) -> (f64, f64) {
        let last = self.num_times() - 1;
        match self.interpolation {
            Interpolation::Step => {
                let t = ((hour / WIND_UPDATE_HOURS) as usize).min(last);
                (self.u[[t, y, x]], self.v[[t, y, x]])
            }
            Interpolation::Linear => {
                let frac = hour as f64 / WIND_UPDATE_HOURS as f64;
                let t0 = (frac.trunc() as usize).min(last);
                let t1 = (frac.trunc() as usize + 1).min(last);
                let alpha = frac.fract();
                let u = (1.0 - alpha) * self.u[[t0, y, x]] + alpha * self.u[[t1, y, x]];
                let v = (1.0 - alpha) * self.v[[t0, y, x]] + alpha * self.v[[t1, y, x]];
                (u, v)
            }
        }
    }
}

impl WindSource for WindField {
    fn wind_internal(&self, lat: f64, lon: f64, hour: u32) -> (f64, f64) {
        let (y, x) = internal_to_grid(lat, lon, self.grid_height(), self.grid_width());
        let (u, v) = self.sample_ms(hour, y, x);
        (u * MS_TO_KMH, v * MS_TO_KMH)
    }

    fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }
}

fn load_component(
    files: &[std::path::PathBuf],
    pressure_level: u32,
) -> Result<(Array3<f64>, Vec<DateTime<Utc>>)> {
    let mut parts: Vec<Array3<f64>> = Vec::with_capacity(files.len());
    let mut times = Vec::new();

    for path in files {
        let content = std::fs::read_to_string(path)?;
        let file: WindFile = serde_json::from_str(&content)?;
        let level_index = file
            .levels
            .iter()
            .position(|l| *l == pressure_level)
            .ok_or_else(|| {
                SimError::WindData(format!(
                    "pressure level {} not present in {:?} (levels {:?})",
                    pressure_level, path, file.levels
                ))
            })?;

        let data = to_array4(&file.data).map_err(|e| {
            SimError::WindData(format!("{:?}: {}", path, e))
        })?;
        if data.shape()[1] != file.levels.len() {
            return Err(SimError::WindData(format!(
                "{:?}: {} levels listed for {} level slices",
                path,
                file.levels.len(),
                data.shape()[1]
            )));
        }
        if data.shape()[0] != file.times.len() {
            return Err(SimError::WindData(format!(
                "{:?}: {} time stamps for {} time steps",
                path,
                file.times.len(),
                data.shape()[0]
            )));
        }

        let mut level = data.index_axis(Axis(1), level_index).to_owned();
        if file.latitude_descending {
            level.invert_axis(Axis(1));
        }
        parts.push(level);
        times.extend(file.times);
    }

    let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
    let joined = concatenate(Axis(0), &views)
        .map_err(|e| SimError::WindData(format!("cannot concatenate wind files: {}", e)))?;
    Ok((joined, times))
}

fn to_array4(data: &[Vec<Vec<Vec<f64>>>]) -> std::result::Result<Array4<f64>, String> {
    let nt = data.len();
    let nl = data.first().map(|t| t.len()).unwrap_or(0);
    let nh = data
        .first()
        .and_then(|t| t.first())
        .map(|l| l.len())
        .unwrap_or(0);
    let nw = data
        .first()
        .and_then(|t| t.first())
        .and_then(|l| l.first())
        .map(|r| r.len())
        .unwrap_or(0);

    let mut flat = Vec::with_capacity(nt * nl * nh * nw);
    for (ti, t) in data.iter().enumerate() {
        if t.len() != nl {
            return Err(format!(
                "ragged wind data: time {} has {} levels, expected {}",
                ti,
                t.len(),
                nl
            ));
        }
        for (li, l) in t.iter().enumerate() {
            if l.len() != nh {
                return Err(format!(
                    "ragged wind data: time {} level {} has {} rows, expected {}",
                    ti,
                    li,
                    l.len(),
                    nh
                ));
            }
            for (yi, r) in l.iter().enumerate() {
                if r.len() != nw {
                    return Err(format!(
                        "ragged wind data: time {} level {} row {} has {} values, expected {}",
                        ti,
                        li,
                        yi,
                        r.len(),
                        nw
                    ));
                }
                flat.extend_from_slice(r);
            }
        }
    }

    Array4::from_shape_vec((nt, nl, nh, nw), flat).map_err(|e| format!("wind data shape: {}", e))
}

/// Uniform noise averaged over each cell's 3x3 neighbourhood (wrapping in x)
fn smoothed_noise(
    rng: &mut ChaCha8Rng,
    h: usize,
    w: usize,
    amplitude: f64,
) -> ndarray::Array2<f64> {
    let raw = ndarray::Array2::from_shape_fn((h, w), |_| rng.gen_range(-1.0..=1.0) * amplitude);
    ndarray::Array2::from_shape_fn((h, w), |(y, x)| {
        let mut sum = 0.0;
        let mut count = 0.0;
        for dy in -1i64..=1 {
            let yy = y as i64 + dy;
            if yy < 0 || yy >= h as i64 {
                continue;
            }
            for dx in -1i64..=1 {
                let xx = (x as i64 + dx).rem_euclid(w as i64);
                sum += raw[[yy as usize, xx as usize]];
                count += 1.0;
            }
        }
        sum / count
    })
}
