//! Time-series normalization.
//!
//! Turns loosely-shaped `{ timestamp, values }` records into a time-sorted
//! series of [`TimePoint`]s, the only input the chart state machine accepts.
//! Records without a timestamp, without values, or with a timestamp that
//! does not parse are dropped without error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::parse_instant_ms;
use crate::model::Process;

/// Series key for process humidity.
pub const HUMIDITY_KEY: &str = "umidade";
/// Series key for process battery state of charge.
pub const BATTERY_KEY: &str = "bateria";

/// One raw record as produced upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub values: Option<BTreeMap<String, f64>>,
}

impl SeriesRecord {
    pub fn new(timestamp: impl Into<String>, values: BTreeMap<String, f64>) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            values: Some(values),
        }
    }
}

/// A normalized sample: epoch milliseconds plus named values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    pub time_ms: i64,
    pub values: BTreeMap<String, f64>,
}

impl TimePoint {
    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// First and last instant of a normalized (sorted) series.
    pub fn extent(points: &[TimePoint]) -> Option<(i64, i64)> {
        Some((points.first()?.time_ms, points.last()?.time_ms))
    }
}

/// Normalize records into an ascending, stably-sorted series.
pub fn normalize<I>(records: I) -> Vec<TimePoint>
where
    I: IntoIterator<Item = SeriesRecord>,
{
    let mut points: Vec<TimePoint> = records
        .into_iter()
        .filter_map(|r| {
            let values = r.values?;
            let time_ms = parse_instant_ms(r.timestamp.as_deref()?)?;
            Some(TimePoint { time_ms, values })
        })
        .collect();
    // `sort_by_key` is stable: equal instants keep their input order.
    points.sort_by_key(|p| p.time_ms);
    points
}

/// Records for a process timeline, one per message.
pub fn records_from_messages(process: &Process) -> Vec<SeriesRecord> {
    process
        .messages
        .iter()
        .map(|m| {
            let mut values = BTreeMap::new();
            if let Some(h) = m.humidity {
                values.insert(HUMIDITY_KEY.to_string(), h);
            }
            if let Some(b) = m.battery {
                values.insert(BATTERY_KEY.to_string(), b);
            }
            SeriesRecord {
                timestamp: m.timestamp.clone(),
                values: Some(values),
            }
        })
        .collect()
}

/// Normalized timeline of a process.
pub fn process_timeline(process: &Process) -> Vec<TimePoint> {
    normalize(records_from_messages(process))
}

// ---------------------------------------------------------------------------
// Series descriptors
// ---------------------------------------------------------------------------

/// How one series is labelled and coloured.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpec {
    pub key: String,
    pub label: String,
    /// RGB colour.
    pub color: (u8, u8, u8),
    /// The main series is drawn last, on top of the others.
    pub main: bool,
}

impl SeriesSpec {
    pub fn new(key: &str, label: &str, color: (u8, u8, u8)) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            color,
            main: false,
        }
    }

    pub fn main(mut self) -> Self {
        self.main = true;
        self
    }
}

/// Series shown on a process chart: humidity is the main line.
pub fn process_series() -> Vec<SeriesSpec> {
    vec![
        SeriesSpec::new(HUMIDITY_KEY, "Humidity", (0x4f, 0xc3, 0xf7)).main(),
        SeriesSpec::new(BATTERY_KEY, "Battery", (0xff, 0xb7, 0x4d)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Message;

    fn rec(ts: &str, key: &str, v: f64) -> SeriesRecord {
        SeriesRecord::new(ts, BTreeMap::from([(key.to_string(), v)]))
    }

    #[test]
    fn normalize_sorts_and_drops_malformed() {
        let out = normalize(vec![
            rec("2024-01-01T00:02:00Z", "a", 1.0),
            rec("2024-01-01T00:01:00Z", "a", 2.0),
            rec("bad", "a", 3.0),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].time_ms, 1_704_067_260_000);
        assert_eq!(out[0].value("a"), Some(2.0));
        assert_eq!(out[1].time_ms, 1_704_067_320_000);
        assert_eq!(out[1].value("a"), Some(1.0));
    }

    #[test]
    fn normalize_drops_records_missing_parts() {
        let out = normalize(vec![
            SeriesRecord {
                timestamp: None,
                values: Some(BTreeMap::new()),
            },
            SeriesRecord {
                timestamp: Some("2024-01-01T00:00:00Z".into()),
                values: None,
            },
        ]);
        assert!(out.is_empty());
    }

    #[test]
    fn normalize_keeps_short_iso_forms() {
        let out = normalize(vec![
            rec("2024-01-01T00:05Z", "a", 1.0),
            rec("2024-01-01T00:03:00+0000", "a", 2.0),
            rec("2024-01-01", "a", 3.0),
        ]);
        let times: Vec<i64> = out.iter().map(|p| p.time_ms).collect();
        assert_eq!(
            times,
            [1_704_067_200_000, 1_704_067_380_000, 1_704_067_500_000]
        );
    }

    #[test]
    fn normalize_is_stable_for_equal_instants() {
        let out = normalize(vec![
            rec("2024-01-01T00:05:00Z", "a", 9.0),
            rec("2024-01-01T00:01:00Z", "first", 1.0),
            rec("2024-01-01T00:01:00Z", "second", 2.0),
            rec("2024-01-01T00:01:00Z", "third", 3.0),
        ]);
        let keys: Vec<&str> = out
            .iter()
            .map(|p| p.values.keys().next().unwrap().as_str())
            .collect();
        assert_eq!(keys, ["first", "second", "third", "a"]);
    }

    #[test]
    fn records_deserialize_from_loose_json() {
        let records: Vec<SeriesRecord> = serde_json::from_value(serde_json::json!([
            { "timestamp": "2024-01-01T00:00:00Z", "values": { "a": 1.5 } },
            { "timestamp": "2024-01-01T00:00:01Z" },
            {}
        ]))
        .unwrap();
        assert_eq!(normalize(records).len(), 1);
    }

    #[test]
    fn extent_of_sorted_series() {
        let pts = normalize(vec![
            rec("2024-01-01T00:03:00Z", "a", 1.0),
            rec("2024-01-01T00:01:00Z", "a", 1.0),
        ]);
        assert_eq!(
            TimePoint::extent(&pts),
            Some((1_704_067_260_000, 1_704_067_380_000))
        );
        assert_eq!(TimePoint::extent(&[]), None);
    }

    #[test]
    fn process_timeline_uses_message_values() {
        let process = Process {
            id: "p".into(),
            messages: vec![
                Message {
                    id: "m1".into(),
                    timestamp: Some("2024-01-01T00:15:00Z".into()),
                    humidity: Some(70.0),
                    battery: Some(90.0),
                },
                Message {
                    id: "m0".into(),
                    timestamp: Some("2024-01-01T00:00:00Z".into()),
                    humidity: Some(80.0),
                    battery: None,
                },
                Message {
                    id: "broken".into(),
                    timestamp: None,
                    humidity: Some(1.0),
                    battery: Some(1.0),
                },
            ],
            ..Default::default()
        };
        let pts = process_timeline(&process);
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0].value(HUMIDITY_KEY), Some(80.0));
        assert_eq!(pts[0].value(BATTERY_KEY), None);
        assert_eq!(pts[1].value(BATTERY_KEY), Some(90.0));
    }

    #[test]
    fn process_series_has_one_main() {
        let specs = process_series();
        assert_eq!(specs.iter().filter(|s| s.main).count(), 1);
        assert_eq!(specs[0].key, HUMIDITY_KEY);
    }
}
