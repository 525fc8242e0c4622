//! GeoJSON export of simulated tracks
//!
//! Trips carry a fourth coordinate with a unix timestamp so map tools can
//! animate them. When the wind data has no wall clock, the hour index is
//! used as seconds instead.

use std::path::Path;

use serde_json::{json, Value};

use crate::balloon::Balloon;
use crate::error::Result;
use crate::fleet::Fleet;

/// How tracks are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackStyle {
    /// `[lon, lat, 0, timestamp]` coordinates for animated playback
    #[default]
    Trips,
    /// Plain `[lon, lat]` line strings
    Lines,
}

fn balloon_feature(balloon: &Balloon, style: TrackStyle) -> Result<Value> {
    let track = balloon.track()?;
    let coordinates: Vec<Value> = match style {
        TrackStyle::Trips => track
            .iter()
            .map(|p| {
                let timestamp = p
                    .time
                    .map(|t| t.timestamp())
                    .unwrap_or(i64::from(p.hour) * 3600);
                json!([p.lon, p.lat, 0, timestamp])
            })
            .collect(),
        TrackStyle::Lines => track.iter().map(|p| json!([p.lon, p.lat])).collect(),
    };

    Ok(json!({
        "type": "Feature",
        "geometry": {
            "type": "LineString",
            "coordinates": coordinates,
        },
        "properties": {
            "balloon_id": balloon.id,
            "points": track.len(),
        },
    }))
}

/// One feature per balloon of a simulated fleet
pub fn fleet_to_geojson(fleet: &Fleet, style: TrackStyle) -> Result<Value> {
    let features = fleet
        .iter()
        .map(|b| balloon_feature(b, style))
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "type": "FeatureCollection",
        "features": features,
    }))
}

pub fn write_geojson(path: impl AsRef<Path>, value: &Value) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text)?;
    tracing::info!("Wrote GeoJSON to {}", path.display());
    Ok(())
}
