//! LoRaWAN webhook receiver

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};

use crate::model::TelemetryRow;
use crate::state::AppState;
use crate::store::Store;
use crate::ttn::UplinkMessage;
use crate::MissionControlError;

pub const SECRET_HEADER: &str = "x-webhook-secret";

/// Compare two secrets without exiting early on the first mismatch
fn secrets_match(expected: &str, provided: &str) -> bool {
    let (a, b) = (expected.as_bytes(), provided.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn check_secret(expected: Option<&str>, headers: &HeaderMap) -> crate::Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if secrets_match(expected, provided) {
        Ok(())
    } else {
        Err(MissionControlError::Unauthorized)
    }
}

/// Decode one uplink and store it as a single telemetry row
pub async fn ingest(
    store: &dyn Store,
    message: &UplinkMessage,
    now: DateTime<Utc>,
) -> crate::Result<TelemetryRow> {
    let row = message.to_telemetry(now)?;
    store.insert_telemetry(&row).await?;
    tracing::debug!(
        "Stored fix for {} at ({:.5}, {:.5}) {:.0} m",
        row.device_id,
        row.latitude,
        row.longitude,
        row.altitude_m
    );
    Ok(row)
}

async fn lorawan_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> crate::Result<(StatusCode, Json<serde_json::Value>)> {
    check_secret(app.config.webhook.secret.as_deref(), &headers)?;

    let message: UplinkMessage = serde_json::from_slice(&body)
        .map_err(|e| MissionControlError::InvalidRequest(format!("malformed uplink: {}", e)))?;
    let row = ingest(app.store.as_ref(), &message, Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "stored",
            "device_id": row.device_id,
        })),
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/webhook/lorawan", post(lorawan_handler))
}
