//! Backend access with synthetic fallback.
//!
//! [`EstufaClient::fetch_entities`] never fails: if the backend cannot be
//! reached, answers with an error status, or sends something that is not
//! JSON, the client logs a warning and returns synthetic data tagged
//! [`DataSource::Synthetic`]. This is the only place that decides between
//! live and synthetic data.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::config::DashboardConfig;
use crate::error::FetchError;
use crate::model::Entity;
use crate::payload::EntitiesPayload;
use crate::synthetic::SyntheticGenerator;

pub const ENTITIES_PATH: &str = "/api/estufas";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Synthetic,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::Synthetic => "synthetic",
        })
    }
}

/// One fetch cycle's snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub entities: Vec<Entity>,
    pub source: DataSource,
}

#[derive(Clone)]
pub struct EstufaClient {
    http: reqwest::Client,
    base_url: String,
    offline: bool,
    generator: SyntheticGenerator,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for EstufaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EstufaClient")
            .field("base_url", &self.base_url)
            .field("offline", &self.offline)
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}

impl EstufaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(c) => c,
            Err(e) => {
                log::warn!("HTTP client setup failed ({e}), using defaults");
                reqwest::Client::new()
            }
        };
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            offline: false,
            generator: SyntheticGenerator::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// A client that never touches the network.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::new("", Duration::from_secs(1))
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        if config.offline {
            Self::offline()
        } else {
            Self::new(&config.api_url, config.request_timeout())
        }
    }

    pub fn with_generator(mut self, generator: SyntheticGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn endpoint(&self) -> String {
        format!("{}{ENTITIES_PATH}", self.base_url)
    }

    pub async fn fetch_entities(&self) -> FetchOutcome {
        match self.try_fetch().await {
            Ok(entities) => FetchOutcome {
                entities,
                source: DataSource::Live,
            },
            Err(e) => {
                if !matches!(e, FetchError::Offline) {
                    log::warn!("{}: {e}; using synthetic data", self.endpoint());
                }
                self.synthetic()
            }
        }
    }

    pub fn synthetic(&self) -> FetchOutcome {
        FetchOutcome {
            entities: self.generator.generate(self.clock.as_ref()),
            source: DataSource::Synthetic,
        }
    }

    async fn try_fetch(&self) -> Result<Vec<Entity>, FetchError> {
        if self.offline {
            return Err(FetchError::Offline);
        }
        let resp = self.http.get(self.endpoint()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = resp.bytes().await?;
        let payload = EntitiesPayload::from_slice(&body)?;
        log::debug!("{}: {} payload", self.endpoint(), payload.shape());
        Ok(payload.into_entities())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    #[tokio::test]
    async fn offline_client_is_synthetic() {
        let clock = FixedClock::at("2024-01-01T00:00:00Z").unwrap();
        let client = EstufaClient::offline()
            .with_generator(SyntheticGenerator::seeded(9))
            .with_clock(Arc::new(clock));
        let out = client.fetch_entities().await;
        assert_eq!(out.source, DataSource::Synthetic);
        assert_eq!(out.entities.len(), 2);
        assert_eq!(out, client.fetch_entities().await);
    }

    #[test]
    fn endpoint_joins_base_url() {
        let c = EstufaClient::new("http://host:1/", Duration::from_secs(1));
        assert_eq!(c.endpoint(), "http://host:1/api/estufas");
    }

    #[test]
    fn config_offline_flag_selects_offline_client() {
        let config = DashboardConfig {
            offline: true,
            ..Default::default()
        };
        assert!(EstufaClient::from_config(&config).is_offline());
        assert!(!EstufaClient::from_config(&DashboardConfig::default()).is_offline());
    }

    #[test]
    fn source_labels() {
        assert_eq!(DataSource::Live.to_string(), "live");
        assert_eq!(
            serde_json::to_value(DataSource::Synthetic).unwrap(),
            serde_json::json!("synthetic")
        );
    }
}
