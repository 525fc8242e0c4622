//! Uplink messages posted by The Things Stack (v3) webhooks

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::TelemetryRow;
use crate::uplink::{self, UplinkError, UplinkFrame};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndDeviceIds {
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_eui: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayIds {
    pub gateway_id: String,
}

/// Reception details from one gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RxMetadata {
    #[serde(default)]
    pub gateway_ids: Option<GatewayIds>,
    #[serde(default)]
    pub rssi: Option<f64>,
    #[serde(default)]
    pub snr: Option<f64>,
}

/// Fields produced by a payload formatter on the network server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedPayload {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub battery: Option<f64>,
    #[serde(default)]
    pub satellites: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UplinkBody {
    #[serde(default)]
    pub f_port: Option<u8>,
    #[serde(default)]
    pub f_cnt: Option<u32>,
    /// Raw application payload, base64
    #[serde(default)]
    pub frm_payload: Option<String>,
    #[serde(default)]
    pub decoded_payload: Option<DecodedPayload>,
    #[serde(default)]
    pub rx_metadata: Vec<RxMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UplinkMessage {
    pub end_device_ids: EndDeviceIds,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
    pub uplink_message: UplinkBody,
}

impl UplinkMessage {
    /// Wrap a raw frame the way the network server would deliver it
    pub fn from_frame(
        device_id: impl Into<String>,
        payload: &[u8],
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            end_device_ids: EndDeviceIds {
                device_id: device_id.into(),
                dev_eui: None,
            },
            received_at: Some(received_at),
            uplink_message: UplinkBody {
                f_port: Some(1),
                f_cnt: None,
                frm_payload: Some(base64::engine::general_purpose::STANDARD.encode(payload)),
                decoded_payload: None,
                rx_metadata: Vec::new(),
            },
        }
    }

    pub fn device_id(&self) -> &str {
        &self.end_device_ids.device_id
    }

    /// Gateway that heard the uplink best
    pub fn best_gateway(&self) -> Option<&RxMetadata> {
        self.uplink_message
            .rx_metadata
            .iter()
            .filter(|m| m.rssi.is_some())
            .max_by(|a, b| {
                a.rssi
                    .unwrap_or(f64::MIN)
                    .total_cmp(&b.rssi.unwrap_or(f64::MIN))
            })
    }

    /// The position and sensor data carried by this uplink
    pub fn frame(&self) -> Result<UplinkFrame, UplinkError> {
        let body = &self.uplink_message;
        if let Some(raw) = &body.frm_payload {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(raw.trim())
                .map_err(|e| UplinkError::Base64(e.to_string()))?;
            return uplink::decode(&bytes);
        }

        let decoded = body
            .decoded_payload
            .as_ref()
            .ok_or(UplinkError::MissingPayload)?;
        uplink::check_position(decoded.latitude, decoded.longitude)?;

        let sensors = match (decoded.temperature, decoded.pressure, decoded.battery) {
            (Some(temperature_c), Some(pressure_hpa), Some(battery_v)) => {
                Some(uplink::SensorReadings {
                    temperature_c,
                    pressure_hpa,
                    battery_v,
                    satellites: decoded.satellites.unwrap_or(0),
                })
            }
            _ => None,
        };

        Ok(UplinkFrame {
            latitude: decoded.latitude,
            longitude: decoded.longitude,
            altitude_m: decoded.altitude,
            sensors,
        })
    }

    /// Convert to a telemetry row; `now` is used when the message has no
    /// reception time
    pub fn to_telemetry(&self, now: DateTime<Utc>) -> Result<TelemetryRow, UplinkError> {
        let frame = self.frame()?;
        let gateway = self.best_gateway();

        let mut row = TelemetryRow {
            id: None,
            device_id: self.device_id().to_string(),
            recorded_at: self.received_at.unwrap_or(now),
            latitude: frame.latitude,
            longitude: frame.longitude,
            altitude_m: frame.altitude_m,
            temperature_c: None,
            pressure_hpa: None,
            battery_v: None,
            satellites: None,
            rssi: gateway.and_then(|g| g.rssi),
            snr: gateway.and_then(|g| g.snr),
        };

        if let Some(sensors) = frame.sensors {
            row.temperature_c = Some(sensors.temperature_c);
            row.pressure_hpa = Some(sensors.pressure_hpa);
            row.battery_v = Some(sensors.battery_v);
            row.satellites = Some(sensors.satellites);
        } else if let Some(decoded) = &self.uplink_message.decoded_payload {
            // partial sensor sets from a formatter are kept field by field
            if self.uplink_message.frm_payload.is_none() {
                row.temperature_c = decoded.temperature;
                row.pressure_hpa = decoded.pressure;
                row.battery_v = decoded.battery;
                row.satellites = decoded.satellites;
            }
        }

        Ok(row)
    }
}
