// Error types shared by the alert and proximity core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Radius was zero, negative or not a finite number.
    #[error("invalid radius: {0} (must be a positive number of meters)")]
    InvalidRadius(f64),

    #[error("unknown report: {0}")]
    UnknownReport(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
