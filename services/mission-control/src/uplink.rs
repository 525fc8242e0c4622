//! Binary uplink frame sent by the tracker
//!
//! All fields are big-endian:
//!
//! | bytes  | field       | encoding            |
//! |--------|-------------|---------------------|
//! | 0..4   | latitude    | i32, 1e-7 degrees   |
//! | 4..8   | longitude   | i32, 1e-7 degrees   |
//! | 8..10  | altitude    | u16, metres         |
//! | 10..12 | temperature | i16, 0.01 °C        |
//! | 12..14 | pressure    | u16, 0.1 hPa        |
//! | 14..16 | battery     | u16, millivolts     |
//! | 16     | satellites  | u8                  |
//!
//! Position-only frames stop after the altitude.

use serde::{Deserialize, Serialize};

pub const POSITION_FRAME_LEN: usize = 10;
pub const FULL_FRAME_LEN: usize = 17;

const DEGREE_SCALE: f64 = 1e7;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UplinkError {
    #[error("expected a 10 or 17 byte frame, got {0} bytes")]
    Length(usize),

    #[error("latitude {0} out of range")]
    Latitude(f64),

    #[error("longitude {0} out of range")]
    Longitude(f64),

    #[error("payload is not valid base64: {0}")]
    Base64(String),

    #[error("uplink carries neither a raw nor a decoded payload")]
    MissingPayload,
}

/// Optional sensor block of a full frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    pub temperature_c: f64,
    pub pressure_hpa: f64,
    pub battery_v: f64,
    pub satellites: u8,
}

/// A decoded tracker frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UplinkFrame {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    pub sensors: Option<SensorReadings>,
}

pub(crate) fn check_position(latitude: f64, longitude: f64) -> Result<(), UplinkError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(UplinkError::Latitude(latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(UplinkError::Longitude(longitude));
    }
    Ok(())
}

pub fn decode(bytes: &[u8]) -> Result<UplinkFrame, UplinkError> {
    if bytes.len() != POSITION_FRAME_LEN && bytes.len() != FULL_FRAME_LEN {
        return Err(UplinkError::Length(bytes.len()));
    }

    let i32_at =
        |i: usize| i32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    let u16_at = |i: usize| u16::from_be_bytes([bytes[i], bytes[i + 1]]);

    let latitude = f64::from(i32_at(0)) / DEGREE_SCALE;
    let longitude = f64::from(i32_at(4)) / DEGREE_SCALE;
    check_position(latitude, longitude)?;

    let sensors = (bytes.len() == FULL_FRAME_LEN).then(|| SensorReadings {
        temperature_c: f64::from(i16::from_be_bytes([bytes[10], bytes[11]])) / 100.0,
        pressure_hpa: f64::from(u16_at(12)) / 10.0,
        battery_v: f64::from(u16_at(14)) / 1000.0,
        satellites: bytes[16],
    });

    Ok(UplinkFrame {
        latitude,
        longitude,
        altitude_m: f64::from(u16_at(8)),
        sensors,
    })
}

/// Encode a frame; values outside a field's range saturate
pub fn encode(frame: &UplinkFrame) -> Result<Vec<u8>, UplinkError> {
    check_position(frame.latitude, frame.longitude)?;

    let mut bytes = Vec::with_capacity(FULL_FRAME_LEN);
    bytes.extend_from_slice(&((frame.latitude * DEGREE_SCALE).round() as i32).to_be_bytes());
    bytes.extend_from_slice(&((frame.longitude * DEGREE_SCALE).round() as i32).to_be_bytes());
    bytes.extend_from_slice(&(frame.altitude_m.round() as u16).to_be_bytes());

    if let Some(sensors) = &frame.sensors {
        bytes.extend_from_slice(&((sensors.temperature_c * 100.0).round() as i16).to_be_bytes());
        bytes.extend_from_slice(&((sensors.pressure_hpa * 10.0).round() as u16).to_be_bytes());
        bytes.extend_from_slice(&((sensors.battery_v * 1000.0).round() as u16).to_be_bytes());
        bytes.push(sensors.satellites);
    }
    Ok(bytes)
}
