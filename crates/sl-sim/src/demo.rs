//! Decorative wind-particle animation
//!
//! A coarse seeded wind grid with particles advected through it one step at
//! a time. Nothing here is tied to real telemetry; the output only has to
//! look plausible and be reproducible for a given seed.

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::constants::KM_PER_DEGREE_LAT;

/// Keeps cells near the poles from collapsing to zero width
const MIN_LON_SCALE: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSettings {
    pub seed: u64,
    pub grid_width: usize,
    pub grid_height: usize,
    pub particle_count: usize,
    /// Steps a particle lives before respawning
    pub max_age: u32,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            seed: 7,
            grid_width: 36,
            grid_height: 18,
            particle_count: 200,
            max_age: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemoParticle {
    pub lat: f64,
    pub lon: f64,
    pub age: u32,
    pub speed_kmh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoFrame {
    pub index: usize,
    pub hours: f64,
    pub particles: Vec<DemoParticle>,
}

#[derive(Debug, Clone, Copy)]
struct Particle {
    x: f64,
    y: f64,
    age: u32,
}

pub struct ParticleDemo {
    settings: DemoSettings,
    rng: ChaCha8Rng,
    /// km/h, row 0 at the south edge
    u: Array2<f64>,
    v: Array2<f64>,
    particles: Vec<Particle>,
    elapsed_hours: f64,
}

impl ParticleDemo {
    pub fn new(settings: DemoSettings) -> Self {
        let width = settings.grid_width.max(2);
        let height = settings.grid_height.max(2);
        let settings = DemoSettings {
            grid_width: width,
            grid_height: height,
            ..settings
        };
        let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);

        let mut u = Array2::zeros((height, width));
        let mut v = Array2::zeros((height, width));
        for y in 0..height {
            let lat = row_latitude(y, height);
            let jet = 120.0 * (-((lat.abs() - 45.0) / 15.0).powi(2)).exp();
            for x in 0..width {
                u[[y, x]] = jet + rng.gen_range(-25.0..25.0);
                v[[y, x]] = rng.gen_range(-20.0..20.0);
            }
        }

        let mut demo = Self {
            particles: Vec::with_capacity(settings.particle_count),
            settings,
            rng,
            u,
            v,
            elapsed_hours: 0.0,
        };
        for _ in 0..demo.settings.particle_count {
            let particle = demo.spawn();
            demo.particles.push(particle);
        }
        demo
    }

    pub fn settings(&self) -> &DemoSettings {
        &self.settings
    }

    fn spawn(&mut self) -> Particle {
        Particle {
            x: self.rng.gen_range(0.0..self.settings.grid_width as f64),
            y: self.rng.gen_range(0.0..(self.settings.grid_height - 1) as f64),
            age: 0,
        }
    }

    /// Bilinear sample in grid space, wrapping in x and clamping in y
    fn sample(&self, x: f64, y: f64) -> (f64, f64) {
        let width = self.settings.grid_width;
        let max_y = (self.settings.grid_height - 1) as f64;

        let y = y.clamp(0.0, max_y);
        let y0 = y.floor() as usize;
        let y1 = (y0 + 1).min(self.settings.grid_height - 1);
        let fy = y - y0 as f64;

        let x = x.rem_euclid(width as f64);
        let x0 = (x.floor() as usize) % width;
        let x1 = (x0 + 1) % width;
        let fx = x - x.floor();

        let lerp = |field: &Array2<f64>| {
            let top = field[[y0, x0]] * (1.0 - fx) + field[[y0, x1]] * fx;
            let bottom = field[[y1, x0]] * (1.0 - fx) + field[[y1, x1]] * fx;
            top * (1.0 - fy) + bottom * fy
        };
        (lerp(&self.u), lerp(&self.v))
    }

    /// Advance every particle by `dt_hours`
    pub fn step(&mut self, dt_hours: f64) {
        let width = self.settings.grid_width as f64;
        let max_y = (self.settings.grid_height - 1) as f64;
        let cell_lon_deg = 360.0 / width;
        let cell_lat_deg = 180.0 / max_y;

        for i in 0..self.particles.len() {
            let p = self.particles[i];
            let (u, v) = self.sample(p.x, p.y);
            let lat = row_latitude_f(p.y, self.settings.grid_height);
            let lon_scale = lat.to_radians().cos().max(MIN_LON_SCALE);

            let dx = u * dt_hours / (KM_PER_DEGREE_LAT * lon_scale * cell_lon_deg);
            let dy = v * dt_hours / (KM_PER_DEGREE_LAT * cell_lat_deg);
            let moved = Particle {
                x: (p.x + dx).rem_euclid(width),
                y: p.y + dy,
                age: p.age + 1,
            };

            let next = if moved.age > self.settings.max_age || moved.y < 0.0 || moved.y > max_y {
                self.spawn()
            } else {
                moved
            };
            self.particles[i] = next;
        }
        self.elapsed_hours += dt_hours;
    }

    /// Current particle positions in geographic coordinates
    pub fn snapshot(&self, index: usize) -> DemoFrame {
        let width = self.settings.grid_width as f64;
        let particles = self
            .particles
            .iter()
            .map(|p| {
                let (u, v) = self.sample(p.x, p.y);
                let lon = p.x / width * 360.0;
                DemoParticle {
                    lat: row_latitude_f(p.y, self.settings.grid_height),
                    lon: if lon > 180.0 { lon - 360.0 } else { lon },
                    age: p.age,
                    speed_kmh: u.hypot(v),
                }
            })
            .collect();
        DemoFrame {
            index,
            hours: self.elapsed_hours,
            particles,
        }
    }

    /// The current state followed by `count - 1` further steps
    pub fn frames(&mut self, count: usize, dt_hours: f64) -> Vec<DemoFrame> {
        let mut frames = Vec::with_capacity(count);
        for index in 0..count {
            if index > 0 {
                self.step(dt_hours);
            }
            frames.push(self.snapshot(index));
        }
        frames
    }
}

fn row_latitude(y: usize, height: usize) -> f64 {
    row_latitude_f(y as f64, height)
}

fn row_latitude_f(y: f64, height: usize) -> f64 {
    y / (height - 1) as f64 * 180.0 - 90.0
}
