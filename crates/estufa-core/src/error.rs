use std::path::PathBuf;

use thiserror::Error;

/// Why a backend fetch did not produce live data.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP error {0}")]
    Status(reqwest::StatusCode),
    #[error("Invalid JSON body: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Client is offline")]
    Offline,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
