//! # estufa-core
//!
//! **Greenhouse drying, at a glance.**
//!
//! `estufa-core` is the library behind the `estufa` dashboard. It decodes the
//! `/api/estufas` feed (installations, their sensors, and their drying
//! processes), derives the KPIs shown on each installation card, normalizes
//! process histories into time series, and holds the interaction state of
//! the time-series chart.
//!
//! ## Quick Start
//!
//! ```no_run
//! use estufa_core::{EstufaClient, EstufaKpis, DEFAULT_INACTIVE_THRESHOLD, SystemClock};
//! use std::time::Duration;
//!
//! # async fn demo() {
//! let client = EstufaClient::new("http://127.0.0.1:8042", Duration::from_secs(5));
//! let outcome = client.fetch_entities().await;
//! for entity in &outcome.entities {
//!     let kpis = EstufaKpis::compute(entity, &SystemClock, DEFAULT_INACTIVE_THRESHOLD);
//!     println!("{} [{}]: {:.2}% avg", entity.id, outcome.source, kpis.humidity_average);
//! }
//! # }
//! ```
//!
//! ## Architecture
//!
//! Backend (or synthetic generator) → [`EntitiesPayload`] → `Vec<Entity>` →
//! KPIs / [`normalize`] → [`ChartState`]
//!
//! Time only enters through a [`Clock`], so everything except the HTTP call
//! is deterministic under test.

pub mod chart;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod metrics;
pub mod model;
pub mod navigator;
pub mod payload;
pub mod series;
pub mod synthetic;

pub use chart::{
    ChartGeometry, ChartState, DEFAULT_WINDOW_MS, Emphasis, GestureAxis, Pointer, SLIDER_MAX,
    Selection, SelectionBand, Tooltip, WINDOW_PRESETS, XDomain, YDomain,
};
pub use client::{DataSource, EstufaClient, FetchOutcome};
pub use clock::{Clock, FixedClock, SystemClock, parse_instant_ms};
pub use config::DashboardConfig;
pub use error::{ConfigError, FetchError};
pub use metrics::{
    DEFAULT_INACTIVE_THRESHOLD, EstufaKpis, humidity_average, inactive_count,
    inactive_count_with_threshold, min_battery,
};
pub use model::{Entity, Message, Process, ProcessSummary, Sensor};
pub use navigator::{Navigator, View};
pub use payload::{EntitiesPayload, PayloadShape};
pub use series::{SeriesRecord, SeriesSpec, TimePoint, normalize, process_series, process_timeline};
pub use synthetic::SyntheticGenerator;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
