//! Wire model for `/api/estufas`.
//!
//! Field names follow the backend's JSON (`umidade`, `soc_bateria`,
//! `startedAt`, ...). Every field is optional on input: a missing or
//! mistyped value falls back to its default instead of failing the whole
//! payload, so one bad sensor never blanks the dashboard.

use serde::{Deserialize, Serialize};

/// Battery level assumed when a reading carries none.
pub const DEFAULT_BATTERY: f64 = 100.0;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A monitored greenhouse installation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "String::is_empty"
    )]
    pub broker: String,
    #[serde(
        default,
        deserialize_with = "lenient::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub sensors: Vec<Sensor>,
    #[serde(
        default,
        deserialize_with = "lenient::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub processes: Vec<Process>,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// The first process flagged active, if any.
    pub fn active_process(&self) -> Option<&Process> {
        self.processes.iter().find(|p| p.active)
    }

    pub fn process(&self, id: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.id == id)
    }
}

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// Latest reading reported by one sensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    #[serde(default, deserialize_with = "lenient::string")]
    pub sensor_id: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        rename = "umidade",
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub humidity: Option<f64>,
    #[serde(
        rename = "last_umidade",
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_humidity: Option<f64>,
    #[serde(
        rename = "soc_bateria",
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub battery: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_seen: Option<String>,
    #[serde(
        rename = "ultima_leitura",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_reading: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub active: Option<bool>,
}

impl Sensor {
    pub fn new(sensor_id: impl Into<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            ..Default::default()
        }
    }

    /// `name` when the backend provides one, the sensor id otherwise.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.sensor_id)
    }

    /// Humidity used for display: the live value, else the last known one.
    pub fn display_humidity(&self) -> Option<f64> {
        self.humidity.or(self.last_humidity)
    }

    pub fn battery_or_default(&self) -> f64 {
        self.battery.unwrap_or(DEFAULT_BATTERY)
    }

    /// Reading instant as sent by the backend. `timestamp` wins over
    /// `last_seen`, which wins over `ultima_leitura`.
    pub fn reading_time(&self) -> Option<&str> {
        self.timestamp
            .as_deref()
            .or(self.last_seen.as_deref())
            .or(self.last_reading.as_deref())
    }

    /// Sensors are active unless the backend explicitly says otherwise.
    pub fn is_active(&self) -> bool {
        self.active != Some(false)
    }
}

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

/// Precomputed aggregates shipped with a process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessSummary {
    #[serde(
        rename = "avgHumidity",
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub avg_humidity: Option<f64>,
    #[serde(
        rename = "minBattery",
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_battery: Option<f64>,
}

/// A drying session. No `endedAt` means the session is still running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Process {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(
        rename = "startedAt",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub started_at: Option<String>,
    #[serde(rename = "endedAt", default, deserialize_with = "lenient::opt_string")]
    pub ended_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::bool_or_false")]
    pub active: bool,
    #[serde(default, deserialize_with = "lenient::summary")]
    pub summary: ProcessSummary,
    #[serde(default, deserialize_with = "lenient::list")]
    pub messages: Vec<Message>,
}

impl Process {
    pub fn is_ongoing(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

/// One humidity/battery sample inside a process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,
    #[serde(
        rename = "umidade",
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub humidity: Option<f64>,
    #[serde(
        rename = "soc_bateria",
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub battery: Option<f64>,
}

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::ProcessSummary;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(opt_string(d)?.unwrap_or_default())
    }

    /// Strings pass through, numbers are stringified, anything else is absent.
    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(Value::deserialize(d)?.as_f64())
    }

    pub fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(Value::deserialize(d)?.as_bool())
    }

    pub fn bool_or_false<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(opt_bool(d)?.unwrap_or(false))
    }

    pub fn summary<'de, D: Deserializer<'de>>(d: D) -> Result<ProcessSummary, D::Error> {
        Ok(serde_json::from_value(Value::deserialize(d)?).unwrap_or_default())
    }

    /// Arrays keep the elements that decode; any other value is an empty list.
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sensor_decodes_portuguese_fields() {
        let s: Sensor = serde_json::from_value(json!({
            "sensor_id": "ESP32_001",
            "umidade": 52.5,
            "soc_bateria": 80,
            "timestamp": "2024-01-01T00:00:00Z",
            "active": false
        }))
        .unwrap();
        assert_eq!(s.sensor_id, "ESP32_001");
        assert_eq!(s.humidity, Some(52.5));
        assert_eq!(s.battery, Some(80.0));
        assert_eq!(s.reading_time(), Some("2024-01-01T00:00:00Z"));
        assert!(!s.is_active());
    }

    #[test]
    fn sensor_defaults_when_fields_missing() {
        let s: Sensor = serde_json::from_value(json!({ "sensor_id": "a" })).unwrap();
        assert_eq!(s.battery_or_default(), 100.0);
        assert_eq!(s.display_humidity(), None);
        assert!(s.is_active());
        assert_eq!(s.reading_time(), None);
    }

    #[test]
    fn sensor_mistyped_fields_become_absent() {
        let s: Sensor = serde_json::from_value(json!({
            "sensor_id": 7,
            "umidade": "wet",
            "soc_bateria": null,
            "active": "yes"
        }))
        .unwrap();
        assert_eq!(s.sensor_id, "7");
        assert_eq!(s.humidity, None);
        assert_eq!(s.battery, None);
        assert_eq!(s.active, None);
    }

    #[test]
    fn reading_time_precedence() {
        let mut s = Sensor::new("a");
        s.last_reading = Some("c".into());
        assert_eq!(s.reading_time(), Some("c"));
        s.last_seen = Some("b".into());
        assert_eq!(s.reading_time(), Some("b"));
        s.timestamp = Some("a".into());
        assert_eq!(s.reading_time(), Some("a"));
    }

    #[test]
    fn display_name_and_humidity_fallbacks() {
        let mut s = Sensor::new("ESP32_009");
        s.last_humidity = Some(40.0);
        assert_eq!(s.display_name(), "ESP32_009");
        assert_eq!(s.display_humidity(), Some(40.0));
        s.name = Some("north wall".into());
        s.humidity = Some(41.0);
        assert_eq!(s.display_name(), "north wall");
        assert_eq!(s.display_humidity(), Some(41.0));
    }

    #[test]
    fn entity_skips_undecodable_children() {
        let e: Entity = serde_json::from_value(json!({
            "id": "estufa_1",
            "sensors": [{ "sensor_id": "a" }, 42, "nope"],
            "processes": null
        }))
        .unwrap();
        assert_eq!(e.sensors.len(), 1);
        assert!(e.processes.is_empty());
        assert_eq!(e.broker, "");
    }

    #[test]
    fn process_decodes_camel_case_fields() {
        let p: Process = serde_json::from_value(json!({
            "id": "proc_1",
            "title": "Processo 1",
            "startedAt": "2024-01-01T00:00:00Z",
            "endedAt": null,
            "active": true,
            "summary": { "avgHumidity": 55.1, "minBattery": 31 },
            "messages": [{ "id": "m0", "timestamp": "2024-01-01T00:15:00Z", "umidade": 60.0 }]
        }))
        .unwrap();
        assert!(p.is_ongoing());
        assert!(p.active);
        assert_eq!(p.summary.avg_humidity, Some(55.1));
        assert_eq!(p.summary.min_battery, Some(31.0));
        assert_eq!(p.messages.len(), 1);
        assert_eq!(p.messages[0].battery, None);
    }

    #[test]
    fn process_title_falls_back_to_id() {
        let p = Process {
            id: "proc_x".into(),
            ..Default::default()
        };
        assert_eq!(p.display_title(), "proc_x");
    }

    #[test]
    fn active_process_lookup() {
        let mut e = Entity::new("e");
        e.processes.push(Process {
            id: "old".into(),
            ended_at: Some("2024-01-01T00:00:00Z".into()),
            ..Default::default()
        });
        e.processes.push(Process {
            id: "now".into(),
            active: true,
            ..Default::default()
        });
        assert_eq!(e.active_process().map(|p| p.id.as_str()), Some("now"));
        assert!(e.process("old").is_some());
        assert!(e.process("missing").is_none());
    }
}
