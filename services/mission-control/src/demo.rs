//! Wind animation demo and the simulated telemetry feed

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Query;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sl_sim::constants::WIND_UPDATE_HOURS;
use sl_sim::{
    DemoFrame, DemoSettings, Fleet, ParticleDemo, SyntheticWind, TrajectoryComputer, WindField,
};
use tokio_util::sync::CancellationToken;

use crate::config::DemoConfig;
use crate::state::AppState;
use crate::store::Store;
use crate::ttn::UplinkMessage;
use crate::uplink::{self, SensorReadings, UplinkFrame};
use crate::webhook;

/// Upper bound on frames served by one demo request
pub const MAX_FRAMES: usize = 240;

const DEFAULT_FRAMES: usize = 60;

/// Simulated hours advanced per animation frame
const FRAME_HOURS: f64 = 1.0;

#[derive(Debug, Default, Deserialize)]
pub struct WindQuery {
    pub seed: Option<u64>,
    pub frames: Option<usize>,
}

/// Frames of the particle animation for a seed
pub fn wind_frames(seed: u64, frames: usize) -> Vec<DemoFrame> {
    let mut demo = ParticleDemo::new(DemoSettings {
        seed,
        ..Default::default()
    });
    demo.frames(frames.min(MAX_FRAMES), FRAME_HOURS)
}

async fn wind_api_handler(Query(query): Query<WindQuery>) -> impl IntoResponse {
    let seed = query.seed.unwrap_or_else(|| DemoSettings::default().seed);
    let frames = query.frames.unwrap_or(DEFAULT_FRAMES);
    Json(wind_frames(seed, frames))
}

async fn wind_page_handler() -> impl IntoResponse {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Wind demo - Stratolink</title>
</head>
<body style="margin: 0; background: #06111f; color: #e6edf5; font-family: system-ui, sans-serif;">
    <canvas id="wind" style="display: block; width: 100vw; height: 90vh;"></canvas>
    <p style="padding: 0 1rem;">Simulated stratospheric wind, not real data.
        <button id="reseed">New wind</button></p>
    <script>
        const canvas = document.getElementById('wind');
        const ctx = canvas.getContext('2d');
        let frames = [];
        let index = 0;

        function resize() {
            canvas.width = canvas.clientWidth;
            canvas.height = canvas.clientHeight;
        }

        function load(seed) {
            fetch('/api/demo/wind?frames=120' + (seed === undefined ? '' : '&seed=' + seed))
                .then(r => r.json())
                .then(data => { frames = data; index = 0; });
        }

        function project(p) {
            return [(p.lon + 180) / 360 * canvas.width, (90 - p.lat) / 180 * canvas.height];
        }

        function draw() {
            ctx.fillStyle = 'rgba(6, 17, 31, 0.15)';
            ctx.fillRect(0, 0, canvas.width, canvas.height);
            const frame = frames[index];
            if (frame) {
                frame.particles.forEach(p => {
                    const [x, y] = project(p);
                    const hue = Math.max(0, 200 - p.speed_kmh);
                    ctx.fillStyle = 'hsl(' + hue + ', 80%, 60%)';
                    ctx.fillRect(x, y, 2, 2);
                });
                index = (index + 1) % frames.length;
            }
            requestAnimationFrame(() => setTimeout(draw, 60));
        }

        window.addEventListener('resize', resize);
        document.getElementById('reseed').onclick = () => load(Math.floor(Math.random() * 1e9));
        resize();
        load();
        draw();
    </script>
</body>
</html>"#,
    )
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/demo/wind", get(wind_page_handler))
        .route("/api/demo/wind", get(wind_api_handler))
}

struct DemoBalloon {
    device_id: String,
    latitude: f64,
    longitude: f64,
}

/// Fleet drifting in a synthetic wind field, reported through the webhook path
pub struct DemoFeed {
    wind: WindField,
    balloons: Vec<DemoBalloon>,
    hour: u32,
}

impl DemoFeed {
    pub fn new(config: &DemoConfig) -> Self {
        let fleet = Fleet::create_random(
            config.balloons,
            (-60.0, 60.0),
            (-180.0, 180.0),
            Some(config.seed),
        );
        let wind = WindField::synthetic(&SyntheticWind {
            seed: config.seed,
            ..Default::default()
        });
        let balloons = fleet
            .iter()
            .enumerate()
            .map(|(i, b)| DemoBalloon {
                device_id: b.id.clone().unwrap_or_else(|| format!("DEMO-{:03}", i)),
                latitude: b.lat,
                longitude: b.lon,
            })
            .collect();

        Self {
            wind,
            balloons,
            hour: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.balloons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balloons.is_empty()
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    fn frame_for(&self, balloon: &DemoBalloon) -> UplinkFrame {
        // float between 10.5 and 12.5 km on a 24 h cycle
        let phase = (self.hour as f64 / 24.0) * std::f64::consts::TAU;
        let altitude_m = 11500.0 + 1000.0 * phase.sin();
        UplinkFrame {
            latitude: balloon.latitude,
            longitude: balloon.longitude,
            altitude_m,
            sensors: Some(SensorReadings {
                temperature_c: -56.5 + (12500.0 - altitude_m) * 0.0065,
                pressure_hpa: 1013.25 * (-altitude_m / 7400.0).exp(),
                battery_v: (4.1 - self.hour as f64 * 0.001).max(3.3),
                satellites: 9,
            }),
        }
    }

    /// Advance every balloon one hour and ingest its new fix.
    ///
    /// Returns the number of rows stored.
    pub async fn tick(&mut self, store: &dyn Store, now: DateTime<Utc>) -> crate::Result<usize> {
        let cycle = self.wind.num_times() as u32 * WIND_UPDATE_HOURS;
        let computer = TrajectoryComputer::new(&self.wind);
        for balloon in &mut self.balloons {
            let (lat, lon) = computer.compute_step(balloon.latitude, balloon.longitude, self.hour);
            balloon.latitude = lat;
            balloon.longitude = lon;
        }
        self.hour = (self.hour + 1) % cycle.max(1);

        let mut stored = 0;
        for balloon in &self.balloons {
            let payload = uplink::encode(&self.frame_for(balloon))?;
            let message = UplinkMessage::from_frame(&balloon.device_id, &payload, now);
            webhook::ingest(store, &message, now).await?;
            stored += 1;
        }
        tracing::debug!("Demo feed stored {} fixes (hour {})", stored, self.hour);
        Ok(stored)
    }

    /// Tick every `interval` until cancelled
    pub async fn run(
        mut self,
        store: Arc<dyn Store>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        tracing::info!(
            "Demo feed started with {} balloons, interval {}",
            self.len(),
            humantime::format_duration(interval)
        );
        loop {
            if let Err(e) = self.tick(store.as_ref(), Utc::now()).await {
                tracing::warn!("Demo feed tick failed: {}", e);
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => {
                    tracing::debug!("Demo feed cancelled");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::store::MemoryStore;

    fn config(balloons: usize) -> DemoConfig {
        DemoConfig {
            enabled: true,
            balloons,
            interval: Duration::from_millis(10),
            seed: 3,
        }
    }

    #[test]
    fn wind_frames_are_capped_and_seeded() {
        assert_eq!(wind_frames(1, 10_000).len(), MAX_FRAMES);
        assert_eq!(wind_frames(5, 3), wind_frames(5, 3));
        assert_ne!(wind_frames(5, 3), wind_frames(6, 3));
    }

    #[tokio::test]
    async fn tick_stores_one_row_per_balloon() {
        let store = MemoryStore::new();
        let mut feed = DemoFeed::new(&config(4));
        assert_eq!(feed.len(), 4);

        assert_eq!(feed.tick(&store, Utc::now()).await.unwrap(), 4);
        assert_eq!(feed.tick(&store, Utc::now()).await.unwrap(), 4);
        assert_eq!(store.telemetry_count().await, 8);
        assert_eq!(feed.hour(), 2);

        let rows = store.latest_telemetry(8).await.unwrap();
        for row in rows {
            assert!((-90.0..=90.0).contains(&row.latitude));
            assert!((-180.0..=180.0).contains(&row.longitude));
            assert!(row.altitude_m > 10000.0 && row.altitude_m < 13000.0);
            assert_eq!(row.satellites, Some(9));
        }
    }

    #[tokio::test]
    async fn balloons_drift() {
        let store = MemoryStore::new();
        let mut feed = DemoFeed::new(&config(1));
        let before = (feed.balloons[0].latitude, feed.balloons[0].longitude);
        feed.tick(&store, Utc::now()).await.unwrap();
        let after = (feed.balloons[0].latitude, feed.balloons[0].longitude);
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn wind_api_returns_frames() {
        let app = crate::build_router(AppState::new(
            Arc::new(MemoryStore::new()),
            Config::default(),
        ));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/demo/wind?seed=9&frames=4")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let frames: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[3]["index"], 3);
        assert!(!frames[0]["particles"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn wind_page_is_html() {
        let app = crate::build_router(AppState::new(
            Arc::new(MemoryStore::new()),
            Config::default(),
        ));
        let response = app
            .oneshot(Request::builder().uri("/demo/wind").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("/api/demo/wind"));
    }
}
