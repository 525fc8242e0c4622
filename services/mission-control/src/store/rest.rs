//! Hosted Postgres reached through its PostgREST interface

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;

use super::Store;
use crate::io::{HttpClient, HttpResponse};
use crate::model::{Device, TelemetryRow};
use crate::MissionControlError;

pub struct RestStore {
    base_url: String,
    api_key: String,
    telemetry_table: String,
    devices_table: String,
    http: Arc<dyn HttpClient>,
}

impl RestStore {
    pub fn new(
        url: &str,
        api_key: &str,
        telemetry_table: &str,
        devices_table: &str,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            telemetry_table: telemetry_table.to_string(),
            devices_table: devices_table.to_string(),
            http,
        }
    }

    fn table_url(&self, table: &str, params: &[(&str, String)]) -> crate::Result<String> {
        let base = format!("{}/rest/v1/{}", self.base_url, table);
        let url = if params.is_empty() {
            Url::parse(&base)
        } else {
            Url::parse_with_params(&base, params)
        }
        .map_err(|e| MissionControlError::Config(format!("Invalid database URL {}: {}", base, e)))?;
        Ok(url.to_string())
    }

    fn headers(&self, prefer: Option<&str>) -> Vec<(String, String)> {
        let mut headers = vec![
            ("apikey".to_string(), self.api_key.clone()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.api_key),
            ),
        ];
        if let Some(prefer) = prefer {
            headers.push(("Prefer".to_string(), prefer.to_string()));
        }
        headers
    }

    fn check(response: HttpResponse, what: &str) -> crate::Result<HttpResponse> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(MissionControlError::Database(format!(
                "{} returned {}: {}",
                what, response.status, response.body
            )))
        }
    }

    async fn fetch_rows<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> crate::Result<Vec<T>> {
        let url = self.table_url(table, params)?;
        let response = self.http.get(&url, &self.headers(None)).await?;
        let response = Self::check(response, &format!("select from {}", table))?;
        serde_json::from_str(&response.body).map_err(|e| {
            MissionControlError::Database(format!("Unexpected rows from {}: {}", table, e))
        })
    }
}

#[async_trait]
impl Store for RestStore {
    async fn insert_telemetry(&self, row: &TelemetryRow) -> crate::Result<()> {
        let url = self.table_url(&self.telemetry_table, &[])?;
        let body = serde_json::to_value(row)?;
        let response = self
            .http
            .post_json(&url, &self.headers(Some("return=minimal")), &body)
            .await?;
        Self::check(response, &format!("insert into {}", self.telemetry_table))?;
        Ok(())
    }

    async fn latest_telemetry(&self, limit: usize) -> crate::Result<Vec<TelemetryRow>> {
        self.fetch_rows(
            &self.telemetry_table,
            &[
                ("select", "*".to_string()),
                ("order", "recorded_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn device_path(
        &self,
        device_id: &str,
        until: Option<DateTime<Utc>>,
        limit: usize,
    ) -> crate::Result<Vec<TelemetryRow>> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("device_id", format!("eq.{}", device_id)),
        ];
        if let Some(until) = until {
            params.push((
                "recorded_at",
                format!("lte.{}", until.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            ));
        }
        params.push(("order", "recorded_at.desc".to_string()));
        params.push(("limit", limit.to_string()));

        let mut rows: Vec<TelemetryRow> = self.fetch_rows(&self.telemetry_table, &params).await?;
        rows.reverse();
        Ok(rows)
    }

    async fn get_device(&self, id: &str) -> crate::Result<Option<Device>> {
        let rows: Vec<Device> = self
            .fetch_rows(
                &self.devices_table,
                &[
                    ("select", "*".to_string()),
                    ("id", format!("eq.{}", id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn update_device(&self, device: &Device) -> crate::Result<()> {
        let url = self.table_url(&self.devices_table, &[("id", format!("eq.{}", device.id))])?;
        let body = serde_json::to_value(device)?;
        let response = self
            .http
            .patch_json(&url, &self.headers(Some("return=representation")), &body)
            .await?;
        let response = Self::check(response, &format!("update {}", self.devices_table))?;
        let updated: Vec<serde_json::Value> = serde_json::from_str(&response.body).map_err(|e| {
            MissionControlError::Database(format!(
                "Unexpected rows from {}: {}",
                self.devices_table, e
            ))
        })?;
        if updated.is_empty() {
            return Err(MissionControlError::NotFound(format!("device {}", device.id)));
        }
        Ok(())
    }

    async fn list_devices(&self) -> crate::Result<Vec<Device>> {
        self.fetch_rows(
            &self.devices_table,
            &[
                ("select", "*".to_string()),
                ("order", "id.asc".to_string()),
            ],
        )
        .await
    }
}
