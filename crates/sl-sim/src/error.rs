//! Error types for the balloon simulation

/// Errors that can occur while loading wind data or running a simulation
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Wind data error: {0}")]
    WindData(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} has not been simulated yet, call simulate() first")]
    NotSimulated(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for simulation operations
pub type Result<T> = std::result::Result<T, SimError>;
