use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for the particle shape generator
#[derive(Error, Debug)]
pub enum ShapeGenError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Degenerate polygon: {0}")]
    DegeneratePolygon(String),

    #[error("Invalid search configuration: {0}")]
    InvalidSearch(String),

    #[error("Distribution error: {0}")]
    Distribution(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, ShapeGenError>;
