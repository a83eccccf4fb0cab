//! Derived KPIs for one installation.
//!
//! All functions are pure over a sensor slice; the only time input is the
//! injected [`Clock`]. Defaults lean towards alerting: an installation with
//! no sensors reports a healthy battery, and a sensor whose reading instant
//! cannot be parsed is counted as inactive rather than skipped.

use std::time::Duration;

use serde::Serialize;

use crate::clock::{Clock, parse_instant_ms};
use crate::model::{DEFAULT_BATTERY, Entity, Sensor};

/// Silence after which a sensor is considered inactive.
pub const DEFAULT_INACTIVE_THRESHOLD: Duration = Duration::from_secs(10 * 60);

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean humidity across sensors (missing humidity counts as 0), rounded to
/// two decimals. Zero for an empty slice.
pub fn humidity_average(sensors: &[Sensor]) -> f64 {
    if sensors.is_empty() {
        return 0.0;
    }
    let sum: f64 = sensors.iter().map(|s| s.humidity.unwrap_or(0.0)).sum();
    round2(sum / sensors.len() as f64)
}

/// Lowest battery across sensors, starting from 100 (missing battery counts
/// as 100). An empty slice reports 100.
pub fn min_battery(sensors: &[Sensor]) -> f64 {
    sensors
        .iter()
        .fold(DEFAULT_BATTERY, |acc, s| acc.min(s.battery_or_default()))
}

/// Whether a sensor has been silent for longer than `threshold` at `now_ms`.
///
/// An absent or unparseable reading instant is inactive.
pub fn is_inactive(sensor: &Sensor, now_ms: i64, threshold: Duration) -> bool {
    match sensor.reading_time().and_then(parse_instant_ms) {
        Some(ts) => now_ms.saturating_sub(ts) > threshold.as_millis() as i64,
        None => true,
    }
}

/// Number of inactive sensors using [`DEFAULT_INACTIVE_THRESHOLD`].
pub fn inactive_count<C: Clock + ?Sized>(sensors: &[Sensor], clock: &C) -> usize {
    inactive_count_with_threshold(sensors, clock, DEFAULT_INACTIVE_THRESHOLD)
}

pub fn inactive_count_with_threshold<C: Clock + ?Sized>(
    sensors: &[Sensor],
    clock: &C,
    threshold: Duration,
) -> usize {
    let now = clock.now_ms();
    sensors
        .iter()
        .filter(|s| is_inactive(s, now, threshold))
        .count()
}

// ---------------------------------------------------------------------------
// KPI record
// ---------------------------------------------------------------------------

/// KPI set shown on an installation card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstufaKpis {
    pub humidity_average: f64,
    pub min_battery: f64,
    pub inactive_count: usize,
    pub sensor_count: usize,
    /// Id of the running process, if one is flagged active.
    pub active_process: Option<String>,
}

impl EstufaKpis {
    pub fn compute<C: Clock + ?Sized>(entity: &Entity, clock: &C, threshold: Duration) -> Self {
        Self {
            humidity_average: humidity_average(&entity.sensors),
            min_battery: min_battery(&entity.sensors),
            inactive_count: inactive_count_with_threshold(&entity.sensors, clock, threshold),
            sensor_count: entity.sensors.len(),
            active_process: entity.active_process().map(|p| p.id.clone()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active_process.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::Process;

    fn sensor(humidity: Option<f64>, battery: Option<f64>, ts: Option<&str>) -> Sensor {
        Sensor {
            sensor_id: "s".into(),
            humidity,
            battery,
            timestamp: ts.map(str::to_string),
            ..Default::default()
        }
    }

    fn clock() -> FixedClock {
        FixedClock::at("2024-01-01T01:00:00Z").unwrap()
    }

    // -----------------------------------------------------------------------
    // humidity_average
    // -----------------------------------------------------------------------

    #[test]
    fn humidity_average_empty_is_zero() {
        assert_eq!(humidity_average(&[]), 0.0);
    }

    #[test]
    fn humidity_average_rounds_to_two_decimals() {
        let sensors = [
            sensor(Some(50.0), None, None),
            sensor(Some(60.0), None, None),
            sensor(Some(70.1), None, None),
        ];
        // 180.1 / 3 = 60.0333...
        assert_eq!(humidity_average(&sensors), 60.03);
    }

    #[test]
    fn humidity_average_counts_missing_as_zero() {
        let sensors = [sensor(Some(80.0), None, None), sensor(None, None, None)];
        assert_eq!(humidity_average(&sensors), 40.0);
    }

    // -----------------------------------------------------------------------
    // min_battery
    // -----------------------------------------------------------------------

    #[test]
    fn min_battery_empty_is_hundred() {
        assert_eq!(min_battery(&[]), 100.0);
    }

    #[test]
    fn min_battery_takes_lowest() {
        let sensors = [
            sensor(None, Some(80.0), None),
            sensor(None, Some(23.0), None),
            sensor(None, None, None),
        ];
        assert_eq!(min_battery(&sensors), 23.0);
    }

    #[test]
    fn min_battery_never_exceeds_ceiling() {
        let sensors = [sensor(None, Some(140.0), None)];
        assert_eq!(min_battery(&sensors), 100.0);
    }

    #[test]
    fn min_battery_stays_in_range_for_valid_inputs() {
        for b in [0.0, 0.5, 12.0, 99.9, 100.0] {
            let sensors = [sensor(None, Some(b), None), sensor(None, Some(100.0), None)];
            let m = min_battery(&sensors);
            assert!((0.0..=100.0).contains(&m));
            assert_eq!(m, b);
        }
    }

    // -----------------------------------------------------------------------
    // inactive_count
    // -----------------------------------------------------------------------

    #[test]
    fn inactive_counts_stale_readings() {
        let sensors = [
            sensor(None, None, Some("2024-01-01T00:59:00Z")), // 1 min
            sensor(None, None, Some("2024-01-01T00:49:00Z")), // 11 min
            sensor(None, None, Some("2024-01-01T00:00:00Z")), // 1 h
        ];
        assert_eq!(inactive_count(&sensors, &clock()), 2);
    }

    #[test]
    fn inactive_exact_threshold_is_still_active() {
        let sensors = [sensor(None, None, Some("2024-01-01T00:50:00Z"))];
        assert_eq!(inactive_count(&sensors, &clock()), 0);
    }

    #[test]
    fn unparseable_timestamp_counts_as_inactive() {
        let sensors = [
            sensor(None, None, Some("not a date")),
            sensor(None, None, None),
            sensor(None, None, Some("2024-01-01T00:59:30Z")),
        ];
        assert_eq!(inactive_count(&sensors, &clock()), 2);
    }

    #[test]
    fn inactive_uses_last_seen_alias() {
        let s = Sensor {
            last_seen: Some("2024-01-01T00:58:00Z".into()),
            ..Default::default()
        };
        assert_eq!(inactive_count(&[s], &clock()), 0);
    }

    #[test]
    fn inactive_respects_custom_threshold() {
        let sensors = [sensor(None, None, Some("2024-01-01T00:58:00Z"))];
        let one_minute = Duration::from_secs(60);
        assert_eq!(
            inactive_count_with_threshold(&sensors, &clock(), one_minute),
            1
        );
    }

    #[test]
    fn minute_precision_reading_is_active() {
        let sensors = [
            sensor(None, None, Some("2024-01-01T00:59Z")),
            sensor(None, None, Some("2024-01-01T00:55")),
            sensor(None, None, Some("2024-01-01T00:58:00+0000")),
        ];
        assert_eq!(inactive_count(&sensors, &clock()), 0);
    }

    #[test]
    fn date_only_reading_is_stale() {
        let sensors = [sensor(None, None, Some("2024-01-01"))];
        assert_eq!(inactive_count(&sensors, &clock()), 1);
    }

    #[test]
    fn future_readings_are_active() {
        let sensors = [sensor(None, None, Some("2024-01-01T02:00:00Z"))];
        assert_eq!(inactive_count(&sensors, &clock()), 0);
    }

    // -----------------------------------------------------------------------
    // EstufaKpis
    // -----------------------------------------------------------------------

    #[test]
    fn kpis_bundle_entity_metrics() {
        let mut e = Entity::new("estufa_1");
        e.sensors = vec![
            sensor(Some(50.0), Some(40.0), Some("2024-01-01T00:59:00Z")),
            sensor(Some(70.0), Some(90.0), Some("bad")),
        ];
        e.processes.push(Process {
            id: "p1".into(),
            active: true,
            ..Default::default()
        });
        let k = EstufaKpis::compute(&e, &clock(), DEFAULT_INACTIVE_THRESHOLD);
        assert_eq!(k.humidity_average, 60.0);
        assert_eq!(k.min_battery, 40.0);
        assert_eq!(k.inactive_count, 1);
        assert_eq!(k.sensor_count, 2);
        assert_eq!(k.active_process.as_deref(), Some("p1"));
        assert!(k.is_running());
    }

    #[test]
    fn kpis_do_not_mutate_entity() {
        let mut e = Entity::new("e");
        e.sensors = vec![sensor(Some(10.0), None, None)];
        let before = e.clone();
        let _ = EstufaKpis::compute(&e, &clock(), DEFAULT_INACTIVE_THRESHOLD);
        assert_eq!(e, before);
    }
}
