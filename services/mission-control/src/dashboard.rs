//! Mission control dashboard: map pages and the JSON API behind them

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::activation::validate_device_id;
use crate::model::TelemetryRow;
use crate::state::AppState;
use crate::MissionControlError;

/// Rows returned by `/api/telemetry/latest` when no limit is given
const DEFAULT_LATEST_ROWS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Desktop,
    Mobile,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub follow: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    pub limit: Option<usize>,
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LatestQuery {
    pub limit: Option<usize>,
}

/// The balloon to follow, if it is a well-formed device id.
///
/// The id ends up inside a JS string literal, so anything else is dropped.
fn follow_target(follow: Option<&str>) -> Option<&str> {
    follow.filter(|id| match validate_device_id(id) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Ignoring follow parameter: {}", e);
            false
        }
    })
}

/// GeoJSON LineString in `[lon, lat, alt]` order
pub fn path_line(rows: &[TelemetryRow]) -> serde_json::Value {
    let coordinates: Vec<[f64; 3]> = rows
        .iter()
        .map(|r| [r.longitude, r.latitude, r.altitude_m])
        .collect();
    serde_json::json!({
        "type": "LineString",
        "coordinates": coordinates,
    })
}

fn render_map_page(layout: Layout, follow: Option<&str>, poll_seconds: u64) -> String {
    let (title, panel_style, map_style) = match layout {
        Layout::Desktop => (
            "Mission Control",
            "position: absolute; top: 0; right: 0; bottom: 0; width: 340px; overflow-y: auto; padding: 1rem; background: #0b1d33; color: #e6edf5;",
            "position: absolute; top: 0; left: 0; bottom: 0; right: 340px;",
        ),
        Layout::Mobile => (
            "Mission Control (mobile)",
            "position: absolute; left: 0; right: 0; bottom: 0; max-height: 40vh; overflow-y: auto; padding: 0.75rem; background: #0b1d33; color: #e6edf5;",
            "position: absolute; top: 0; left: 0; right: 0; bottom: 40vh;",
        ),
    };
    let follow = follow_target(follow).unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Stratolink {title}</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
</head>
<body style="margin: 0; font-family: system-ui, sans-serif;">
    <div id="map" style="{map_style}"></div>
    <aside style="{panel_style}">
        <h1 style="font-size: 1.2rem; margin: 0 0 0.5rem 0;">{title}</h1>
        <div style="font-size: 0.8em; opacity: 0.8;">Updated <span id="updated">never</span>, every {poll_seconds} s</div>
        <label style="display: block; margin: 0.75rem 0;">
            <input type="checkbox" id="ride-along"> Ride along with <span id="follow-name">{follow_label}</span>
        </label>
        <div id="scrubber-box" style="display: none; margin-bottom: 0.75rem;">
            <input type="range" id="scrubber" min="0" max="0" value="0" style="width: 100%;">
            <div id="scrub-info" style="font-size: 0.85em;"></div>
        </div>
        <table style="width: 100%; border-collapse: collapse; font-size: 0.9em;">
            <thead>
                <tr style="border-bottom: 2px solid #35506e;">
                    <th style="padding: 0.3rem; text-align: left;">Balloon</th>
                    <th style="padding: 0.3rem; text-align: right;">Alt (m)</th>
                    <th style="padding: 0.3rem; text-align: right;">Last fix</th>
                </tr>
            </thead>
            <tbody id="balloon-body"></tbody>
        </table>
    </aside>
    <script>
        const POLL_MS = {poll_ms};
        let follow = '{follow}' || null;
        let path = [];
        const markers = {{}};
        const map = L.map('map').setView([20, 0], 2);
        L.tileLayer('https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
            maxZoom: 18,
            attribution: '&copy; OpenStreetMap contributors'
        }}).addTo(map);
        const line = L.polyline([], {{ color: '#ff7a18', weight: 3 }}).addTo(map);
        const cursor = L.circleMarker([0, 0], {{ radius: 6, color: '#fff' }});
        const rideAlong = document.getElementById('ride-along');
        const scrubber = document.getElementById('scrubber');
        // stay on the newest point until the user drags the scrubber back
        let pinned = true;
        rideAlong.checked = follow !== null;

        function select(id) {{
            follow = id;
            pinned = true;
            document.getElementById('follow-name').textContent = id;
            loadPath();
        }}

        function loadPath() {{
            if (!follow) return;
            fetch('/api/balloons/' + encodeURIComponent(follow) + '/path')
                .then(r => r.json())
                .then(data => {{
                    path = data.points || [];
                    line.setLatLngs(path.map(p => [p.latitude, p.longitude]));
                    const box = document.getElementById('scrubber-box');
                    box.style.display = path.length ? 'block' : 'none';
                    scrubber.max = Math.max(path.length - 1, 0);
                    if (pinned) scrubber.value = scrubber.max;
                    scrub();
                }});
        }}

        function scrub() {{
            const p = path[Number(scrubber.value)];
            if (!p) return;
            cursor.setLatLng([p.latitude, p.longitude]).addTo(map);
            document.getElementById('scrub-info').textContent =
                new Date(p.recorded_at).toLocaleString() + ' - ' + Math.round(p.altitude_m) + ' m';
        }}
        scrubber.addEventListener('input', () => {{
            pinned = Number(scrubber.value) === Number(scrubber.max);
            scrub();
        }});

        function refreshData() {{
            fetch('/api/balloons')
                .then(r => r.json())
                .then(data => {{
                    document.getElementById('updated').textContent =
                        data.last_poll ? new Date(data.last_poll).toLocaleTimeString() : 'never';
                    const tbody = document.getElementById('balloon-body');
                    tbody.innerHTML = '';
                    data.balloons.forEach(b => {{
                        const pos = [b.latitude, b.longitude];
                        if (!markers[b.device_id]) {{
                            markers[b.device_id] = L.marker(pos).addTo(map)
                                .on('click', () => select(b.device_id));
                        }}
                        markers[b.device_id].setLatLng(pos).bindTooltip(b.name);
                        const tr = document.createElement('tr');
                        tr.style.cursor = 'pointer';
                        tr.onclick = () => select(b.device_id);
                        [b.name, Math.round(b.altitude_m), new Date(b.recorded_at).toLocaleTimeString()]
                            .forEach((v, i) => {{
                                const td = document.createElement('td');
                                td.style.padding = '0.3rem';
                                td.style.textAlign = i === 0 ? 'left' : 'right';
                                td.textContent = v;
                                tr.appendChild(td);
                            }});
                        tbody.appendChild(tr);
                        if (rideAlong.checked && b.device_id === follow) {{
                            map.setView(pos, Math.max(map.getZoom(), 7));
                        }}
                    }});
                    loadPath();
                }});
        }}
        refreshData();
        setInterval(refreshData, POLL_MS);
    </script>
</body>
</html>"#,
        title = title,
        map_style = map_style,
        panel_style = panel_style,
        poll_seconds = poll_seconds,
        poll_ms = poll_seconds * 1000,
        follow = follow,
        follow_label = if follow.is_empty() { "none" } else { follow },
    )
}

fn poll_seconds(app: &AppState) -> u64 {
    app.config.dashboard.poll_interval.as_secs().max(1)
}

async fn desktop_handler(
    State(app): State<AppState>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    Html(render_map_page(
        Layout::Desktop,
        query.follow.as_deref(),
        poll_seconds(&app),
    ))
}

async fn mobile_handler(
    State(app): State<AppState>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    Html(render_map_page(
        Layout::Mobile,
        query.follow.as_deref(),
        poll_seconds(&app),
    ))
}

async fn balloons_handler(State(app): State<AppState>) -> impl IntoResponse {
    let state = app.fleet.read().await;
    Json(serde_json::json!({
        "balloons": state.snapshot.balloons,
        "taken_at": state.snapshot.taken_at,
        "last_poll": state.last_poll,
        "polls": state.polls,
        "consecutive_errors": state.consecutive_errors,
        "last_error": state.last_error,
        "poll_interval_secs": state.poll_interval.as_secs(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

async fn path_handler(
    State(app): State<AppState>,
    Path(device_id): Path<String>,
    Query(query): Query<PathQuery>,
) -> crate::Result<Json<serde_json::Value>> {
    validate_device_id(&device_id)?;
    let max = app.config.dashboard.path_limit;
    let limit = query.limit.unwrap_or(max).clamp(1, max.max(1));

    let points = app
        .store
        .device_path(&device_id, query.until, limit)
        .await?;
    tracing::debug!("Path for {}: {} points", device_id, points.len());

    Ok(Json(serde_json::json!({
        "device_id": device_id,
        "line": path_line(&points),
        "points": points,
    })))
}

async fn latest_handler(
    State(app): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> crate::Result<Json<Vec<TelemetryRow>>> {
    let max = app.config.dashboard.latest_limit.max(1);
    let limit = query.limit.unwrap_or(DEFAULT_LATEST_ROWS);
    if limit == 0 {
        return Err(MissionControlError::InvalidRequest(
            "limit must be positive".to_string(),
        ));
    }
    Ok(Json(app.store.latest_telemetry(limit.min(max)).await?))
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/mission-control", get(desktop_handler))
        .route("/mission-control/mobile", get(mobile_handler))
        .route("/api/balloons", get(balloons_handler))
        .route("/api/balloons/{device_id}/path", get(path_handler))
        .route("/api/telemetry/latest", get(latest_handler))
        .route("/health", get(health_handler))
}
