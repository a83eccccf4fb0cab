//! Dashboard settings.
//!
//! Defaults, overridden by an optional JSON file, overridden by CLI flags.
//! Only the first two layers live here; the CLI applies its own flags.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chart::DEFAULT_WINDOW_MS;
use crate::error::ConfigError;
use crate::metrics::DEFAULT_INACTIVE_THRESHOLD;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8042";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Backend base URL; `/api/estufas` is appended.
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub refresh_secs: u64,
    pub inactive_threshold_min: u64,
    /// Initial chart follow window in milliseconds.
    pub window_ms: i64,
    /// Never contact the backend.
    pub offline: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 5,
            refresh_secs: 10,
            inactive_threshold_min: DEFAULT_INACTIVE_THRESHOLD.as_secs() / 60,
            window_ms: DEFAULT_WINDOW_MS,
            offline: false,
        }
    }
}

impl DashboardConfig {
    /// Load a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(invalid("api_url", "must not be empty"));
        }
        if self.refresh_secs == 0 {
            return Err(invalid("refresh_secs", "must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be at least 1"));
        }
        if self.window_ms <= 0 {
            return Err(invalid("window_ms", "must be positive"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn inactive_threshold(&self) -> Duration {
        Duration::from_secs(self.inactive_threshold_min * 60)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
