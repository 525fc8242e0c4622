//! Device activation: PIN check, the four-step launch wizard and the single
//! read-check-write that marks a tracker as flying.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::ActivationConfig;
use crate::model::{Device, DeviceStatus, LaunchInfo};
use crate::state::AppState;
use crate::store::Store;
use crate::MissionControlError;

static DEVICE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("device id pattern"));
static PIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}$").expect("PIN pattern"));

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActivationError {
    #[error("device id must be 1-64 letters, digits, '-' or '_'")]
    InvalidDeviceId,

    #[error("PIN must be exactly 6 digits")]
    InvalidPin,

    #[error("unknown device or wrong PIN")]
    InvalidCredentials,

    #[error("device {0} is already {1}")]
    AlreadyActivated(String, DeviceStatus),

    #[error("device has been retired")]
    Retired,

    #[error("activation session not found or expired")]
    SessionNotFound,

    #[error("session is at step {actual}, expected {expected}")]
    WrongStep {
        expected: WizardStep,
        actual: WizardStep,
    },

    #[error("cannot go back from step {0}")]
    CannotGoBack(WizardStep),

    #[error("hardware checklist incomplete: {}", .0.join(", "))]
    ChecklistIncomplete(Vec<&'static str>),

    #[error("location rejected: {0}")]
    LocationRejected(String),

    #[error("launch button held for {held_ms} ms, {required_ms} ms required")]
    HoldTooShort { held_ms: u64, required_ms: u64 },

    #[error("PIN hashing failed: {0}")]
    Hash(String),
}

impl ActivationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ActivationError::InvalidDeviceId
            | ActivationError::InvalidPin
            | ActivationError::ChecklistIncomplete(_)
            | ActivationError::LocationRejected(_)
            | ActivationError::HoldTooShort { .. } => StatusCode::BAD_REQUEST,
            ActivationError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ActivationError::SessionNotFound => StatusCode::NOT_FOUND,
            ActivationError::AlreadyActivated(..)
            | ActivationError::Retired
            | ActivationError::WrongStep { .. }
            | ActivationError::CannotGoBack(_) => StatusCode::CONFLICT,
            ActivationError::Hash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub fn validate_device_id(id: &str) -> Result<(), ActivationError> {
    if DEVICE_ID_PATTERN.is_match(id) {
        Ok(())
    } else {
        Err(ActivationError::InvalidDeviceId)
    }
}

pub fn validate_pin(pin: &str) -> Result<(), ActivationError> {
    if PIN_PATTERN.is_match(pin) {
        Ok(())
    } else {
        Err(ActivationError::InvalidPin)
    }
}

/// Hash a PIN into an Argon2 PHC string
pub fn hash_pin(pin: &str) -> Result<String, ActivationError> {
    validate_pin(pin)?;
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ActivationError::Hash(e.to_string()))
}

/// Check a PIN against a stored hash; unparseable hashes never match
pub fn verify_pin(pin: &str, pin_hash: &str) -> bool {
    match PasswordHash::new(pin_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(pin.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored PIN hash is not a valid PHC string: {}", e);
            false
        }
    }
}

/// Fail unless the device can still be launched
fn ensure_activatable(device: &Device) -> Result<(), ActivationError> {
    match device.status {
        DeviceStatus::Storage => Ok(()),
        DeviceStatus::Retired => Err(ActivationError::Retired),
        status => Err(ActivationError::AlreadyActivated(device.id.clone(), status)),
    }
}

/// Look up a device and check its PIN.
///
/// Unknown devices and wrong PINs produce the same error.
pub async fn verify_credentials(
    store: &dyn Store,
    device_id: &str,
    pin: &str,
) -> crate::Result<Device> {
    validate_device_id(device_id)?;
    validate_pin(pin)?;

    let Some(device) = store.get_device(device_id).await? else {
        tracing::debug!("Activation attempt for unknown device");
        return Err(ActivationError::InvalidCredentials.into());
    };

    let pin = pin.to_string();
    let pin_hash = device.pin_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_pin(&pin, &pin_hash))
        .await
        .map_err(|e| ActivationError::Hash(e.to_string()))?;

    if matches {
        Ok(device)
    } else {
        tracing::debug!("Wrong PIN for device {}", device_id);
        Err(ActivationError::InvalidCredentials.into())
    }
}

/// A launch site fix from the browser's geolocation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaunchLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

impl LaunchLocation {
    fn validate(&self, max_accuracy_m: f64) -> Result<(), ActivationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ActivationError::LocationRejected(format!(
                "latitude {} out of range",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ActivationError::LocationRejected(format!(
                "longitude {} out of range",
                self.longitude
            )));
        }
        match self.accuracy_m {
            None => Err(ActivationError::LocationRejected(
                "fix accuracy unknown".to_string(),
            )),
            Some(acc) if !acc.is_finite() || acc < 0.0 || acc > max_accuracy_m => {
                Err(ActivationError::LocationRejected(format!(
                    "accuracy {} m exceeds {} m",
                    acc, max_accuracy_m
                )))
            }
            Some(_) => Ok(()),
        }
    }
}

/// Re-read the device and, if it is still in storage, mark it flying.
pub async fn commit_activation(
    store: &dyn Store,
    device_id: &str,
    location: &LaunchLocation,
    now: DateTime<Utc>,
) -> crate::Result<Device> {
    let mut device = store
        .get_device(device_id)
        .await?
        .ok_or(ActivationError::InvalidCredentials)?;
    ensure_activatable(&device)?;

    device.status = DeviceStatus::Flying;
    device.launch = Some(LaunchInfo {
        latitude: location.latitude,
        longitude: location.longitude,
        launched_at: now,
    });
    device.activated_at = Some(now);
    store.update_device(&device).await?;

    tracing::info!(
        "Device {} activated at ({:.5}, {:.5})",
        device.id,
        location.latitude,
        location.longitude
    );
    Ok(device)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivationRequest {
    pub device_id: String,
    pub pin: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// The single server action: check credentials, then commit
pub async fn activate_device(
    store: &dyn Store,
    request: &ActivationRequest,
    now: DateTime<Utc>,
) -> crate::Result<Device> {
    verify_credentials(store, &request.device_id, &request.pin).await?;
    let location = LaunchLocation {
        latitude: request.latitude,
        longitude: request.longitude,
        accuracy_m: None,
    };
    if !(-90.0..=90.0).contains(&location.latitude)
        || !(-180.0..=180.0).contains(&location.longitude)
    {
        return Err(
            ActivationError::LocationRejected("coordinates out of range".to_string()).into(),
        );
    }
    commit_activation(store, &request.device_id, &location, now).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Credentials,
    HardwareCheck,
    LocationLock,
    Confirm,
    Complete,
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WizardStep::Credentials => "credentials",
            WizardStep::HardwareCheck => "hardware_check",
            WizardStep::LocationLock => "location_lock",
            WizardStep::Confirm => "confirm",
            WizardStep::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Pre-flight items the operator ticks off before launch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareChecklist {
    #[serde(default)]
    pub antenna_attached: bool,
    #[serde(default)]
    pub battery_charged: bool,
    #[serde(default)]
    pub gps_sky_view: bool,
    #[serde(default)]
    pub payload_sealed: bool,
}

impl HardwareChecklist {
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (self.antenna_attached, "antenna_attached"),
            (self.battery_charged, "battery_charged"),
            (self.gps_sky_view, "gps_sky_view"),
            (self.payload_sealed, "payload_sealed"),
        ]
        .into_iter()
        .filter(|(done, _)| !done)
        .map(|(_, name)| name)
        .collect()
    }
}

/// Progress of one operator through the wizard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardSession {
    pub id: Uuid,
    pub device_id: String,
    pub step: WizardStep,
    pub checklist: Option<HardwareChecklist>,
    pub location: Option<LaunchLocation>,
    pub expires_at: DateTime<Utc>,
}

impl WizardSession {
    pub fn new(device_id: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id: device_id.into(),
            step: WizardStep::Credentials,
            checklist: None,
            location: None,
            expires_at,
        }
    }

    fn require(&self, expected: WizardStep) -> Result<(), ActivationError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(ActivationError::WrongStep {
                expected,
                actual: self.step,
            })
        }
    }

    pub fn credentials_accepted(&mut self) -> Result<(), ActivationError> {
        self.require(WizardStep::Credentials)?;
        self.step = WizardStep::HardwareCheck;
        Ok(())
    }

    pub fn confirm_hardware(
        &mut self,
        checklist: HardwareChecklist,
    ) -> Result<(), ActivationError> {
        self.require(WizardStep::HardwareCheck)?;
        let missing = checklist.missing();
        if !missing.is_empty() {
            return Err(ActivationError::ChecklistIncomplete(missing));
        }
        self.checklist = Some(checklist);
        self.step = WizardStep::LocationLock;
        Ok(())
    }

    pub fn lock_location(
        &mut self,
        location: LaunchLocation,
        max_accuracy_m: f64,
    ) -> Result<(), ActivationError> {
        self.require(WizardStep::LocationLock)?;
        location.validate(max_accuracy_m)?;
        self.location = Some(location);
        self.step = WizardStep::Confirm;
        Ok(())
    }

    /// Check the hold on the launch button, returning the locked location
    pub fn check_hold(
        &self,
        held: Duration,
        required: Duration,
    ) -> Result<LaunchLocation, ActivationError> {
        self.require(WizardStep::Confirm)?;
        if held < required {
            return Err(ActivationError::HoldTooShort {
                held_ms: held.as_millis() as u64,
                required_ms: required.as_millis() as u64,
            });
        }
        self.location
            .ok_or(ActivationError::WrongStep {
                expected: WizardStep::LocationLock,
                actual: self.step,
            })
    }

    pub fn back(&mut self) -> Result<(), ActivationError> {
        self.step = match self.step {
            WizardStep::Credentials | WizardStep::Complete => {
                return Err(ActivationError::CannotGoBack(self.step))
            }
            WizardStep::HardwareCheck => WizardStep::Credentials,
            WizardStep::LocationLock => {
                self.checklist = None;
                WizardStep::HardwareCheck
            }
            WizardStep::Confirm => {
                self.location = None;
                WizardStep::LocationLock
            }
        };
        Ok(())
    }
}

/// Device fields that are safe to show in the browser
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSummary {
    pub id: String,
    pub name: Option<String>,
    pub status: DeviceStatus,
    pub launch: Option<LaunchInfo>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl From<&Device> for DeviceSummary {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            name: device.name.clone(),
            status: device.status,
            launch: device.launch.clone(),
            activated_at: device.activated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: WizardSession,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceSummary>,
}

/// Wizard sessions kept in memory until they expire
pub struct ActivationSessions {
    sessions: Mutex<HashMap<Uuid, WizardSession>>,
    config: ActivationConfig,
}

impl ActivationSessions {
    pub fn new(config: ActivationConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.config.session_ttl)
            .unwrap_or_else(|_| chrono::Duration::minutes(15));
        now + ttl
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Step 1: check credentials and open a session at the hardware check
    pub async fn create(
        &self,
        store: &dyn Store,
        device_id: &str,
        pin: &str,
        now: DateTime<Utc>,
    ) -> crate::Result<SessionView> {
        let device = verify_credentials(store, device_id, pin).await?;
        ensure_activatable(&device)?;

        let mut session = WizardSession::new(device_id, self.expiry(now));
        session.credentials_accepted()?;

        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session.id, session.clone());
        tracing::debug!(
            "Opened activation session {} for {} ({} active)",
            session.id,
            device_id,
            sessions.len()
        );

        Ok(SessionView {
            session,
            device: Some(DeviceSummary::from(&device)),
        })
    }

    /// Apply `f` to a live session, refreshing its expiry on success
    async fn with_session<F>(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        f: F,
    ) -> crate::Result<WizardSession>
    where
        F: FnOnce(&mut WizardSession) -> Result<(), ActivationError>,
    {
        let mut sessions = self.sessions.lock().await;
        let expired = match sessions.get(&id) {
            None => return Err(ActivationError::SessionNotFound.into()),
            Some(s) => s.expires_at <= now,
        };
        if expired {
            sessions.remove(&id);
            tracing::debug!("Activation session {} expired", id);
            return Err(ActivationError::SessionNotFound.into());
        }

        let expiry = self.expiry(now);
        let session = sessions
            .get_mut(&id)
            .ok_or(ActivationError::SessionNotFound)?;
        f(session)?;
        session.expires_at = expiry;
        Ok(session.clone())
    }

    pub async fn get(&self, id: Uuid, now: DateTime<Utc>) -> crate::Result<WizardSession> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&id) {
            Some(s) if s.expires_at > now => Ok(s.clone()),
            Some(_) => {
                sessions.remove(&id);
                Err(ActivationError::SessionNotFound.into())
            }
            None => Err(ActivationError::SessionNotFound.into()),
        }
    }

    /// Re-enter credentials after going back to step 1
    pub async fn submit_credentials(
        &self,
        store: &dyn Store,
        id: Uuid,
        pin: &str,
        now: DateTime<Utc>,
    ) -> crate::Result<WizardSession> {
        let session = self.get(id, now).await?;
        session.require(WizardStep::Credentials)?;
        let device = verify_credentials(store, &session.device_id, pin).await?;
        ensure_activatable(&device)?;
        self.with_session(id, now, |s| s.credentials_accepted()).await
    }

    pub async fn confirm_hardware(
        &self,
        id: Uuid,
        checklist: HardwareChecklist,
        now: DateTime<Utc>,
    ) -> crate::Result<WizardSession> {
        self.with_session(id, now, |s| s.confirm_hardware(checklist))
            .await
    }

    pub async fn lock_location(
        &self,
        id: Uuid,
        location: LaunchLocation,
        now: DateTime<Utc>,
    ) -> crate::Result<WizardSession> {
        let max_accuracy_m = self.config.max_location_accuracy_m;
        self.with_session(id, now, |s| s.lock_location(location, max_accuracy_m))
            .await
    }

    /// Final step: the hold-to-launch button was released after `held`.
    ///
    /// The session lock is released while the store commits.
    pub async fn confirm(
        &self,
        store: &dyn Store,
        id: Uuid,
        held: Duration,
        now: DateTime<Utc>,
    ) -> crate::Result<SessionView> {
        let session = self.get(id, now).await?;
        let location = session.check_hold(held, self.config.hold_duration)?;

        let device = commit_activation(store, &session.device_id, &location, now).await?;

        let mut sessions = self.sessions.lock().await;
        let session = match sessions.get_mut(&id) {
            Some(live) => {
                live.step = WizardStep::Complete;
                live.clone()
            }
            None => WizardSession {
                step: WizardStep::Complete,
                ..session
            },
        };

        Ok(SessionView {
            session,
            device: Some(DeviceSummary::from(&device)),
        })
    }

    pub async fn back(&self, id: Uuid, now: DateTime<Utc>) -> crate::Result<WizardSession> {
        self.with_session(id, now, |s| s.back()).await
    }
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    device_id: String,
    pin: String,
}

#[derive(Debug, Deserialize)]
struct CredentialsRequest {
    pin: String,
}

#[derive(Debug, Deserialize)]
struct ConfirmRequest {
    held_ms: u64,
}

fn parse_session_id(id: &str) -> crate::Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| ActivationError::SessionNotFound.into())
}

/// Decode a JSON request body, reporting any problem as a 400
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> crate::Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| MissionControlError::InvalidRequest(format!("malformed request: {}", e)))
}

async fn activate_handler(
    State(app): State<AppState>,
    body: Bytes,
) -> crate::Result<Json<DeviceSummary>> {
    let request: ActivationRequest = parse_body(&body)?;
    let device = activate_device(app.store.as_ref(), &request, Utc::now()).await?;
    Ok(Json(DeviceSummary::from(&device)))
}

async fn create_session_handler(
    State(app): State<AppState>,
    body: Bytes,
) -> crate::Result<(StatusCode, Json<SessionView>)> {
    let request: CreateSessionRequest = parse_body(&body)?;
    let view = app
        .sessions
        .create(app.store.as_ref(), &request.device_id, &request.pin, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_session_handler(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> crate::Result<Json<WizardSession>> {
    let id = parse_session_id(&id)?;
    Ok(Json(app.sessions.get(id, Utc::now()).await?))
}

async fn credentials_handler(
    State(app): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> crate::Result<Json<WizardSession>> {
    let id = parse_session_id(&id)?;
    let request: CredentialsRequest = parse_body(&body)?;
    let session = app
        .sessions
        .submit_credentials(app.store.as_ref(), id, &request.pin, Utc::now())
        .await?;
    Ok(Json(session))
}

async fn hardware_handler(
    State(app): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> crate::Result<Json<WizardSession>> {
    let id = parse_session_id(&id)?;
    let checklist: HardwareChecklist = parse_body(&body)?;
    Ok(Json(
        app.sessions
            .confirm_hardware(id, checklist, Utc::now())
            .await?,
    ))
}

async fn location_handler(
    State(app): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> crate::Result<Json<WizardSession>> {
    let id = parse_session_id(&id)?;
    let location: LaunchLocation = parse_body(&body)?;
    Ok(Json(
        app.sessions.lock_location(id, location, Utc::now()).await?,
    ))
}

async fn confirm_handler(
    State(app): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> crate::Result<Json<SessionView>> {
    let id = parse_session_id(&id)?;
    let request: ConfirmRequest = parse_body(&body)?;
    let view = app
        .sessions
        .confirm(
            app.store.as_ref(),
            id,
            Duration::from_millis(request.held_ms),
            Utc::now(),
        )
        .await?;
    Ok(Json(view))
}

async fn back_handler(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> crate::Result<Json<WizardSession>> {
    let id = parse_session_id(&id)?;
    Ok(Json(app.sessions.back(id, Utc::now()).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/activate", post(activate_handler))
        .route("/api/activation/sessions", post(create_session_handler))
        .route("/api/activation/sessions/{id}", get(get_session_handler))
        .route(
            "/api/activation/sessions/{id}/credentials",
            post(credentials_handler),
        )
        .route(
            "/api/activation/sessions/{id}/hardware",
            post(hardware_handler),
        )
        .route(
            "/api/activation/sessions/{id}/location",
            post(location_handler),
        )
        .route(
            "/api/activation/sessions/{id}/confirm",
            post(confirm_handler),
        )
        .route("/api/activation/sessions/{id}/back", post(back_handler))
}
