//! Synthetic installation data.
//!
//! Stands in for the backend when it is unreachable and feeds the mock
//! server. The fixture is fixed (two installations, eight sensors each, two
//! drying processes each); the readings are random but reproducible with a
//! seed.
//!
//! Process humidity follows a drying curve:
//!
//! ```text
//! h(t) = h_inf + (h0 - h_inf) * exp(-t / tau) + A * sin(2*pi*t / P) + noise
//! ```
//!
//! with `t` in hours since the process started, and battery draining
//! linearly from its starting charge.

use std::f64::consts::TAU;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::Clock;
use crate::metrics::round2;
use crate::model::{Entity, Message, Process, ProcessSummary, Sensor};

const SENSORS_PER_ENTITY: usize = 8;
const MESSAGES_PER_PROCESS: usize = 12;
const MESSAGE_INTERVAL_MIN: i64 = 15;
const MAX_READING_AGE_MIN: f64 = 30.0;

/// Periodic term: amplitude (percentage points) and period (hours).
const WAVE_AMPLITUDE: f64 = 1.5;
const WAVE_PERIOD_H: f64 = 1.0;
const NOISE: f64 = 1.0;

struct EntityTemplate {
    id: &'static str,
    broker: &'static str,
    first_sensor: usize,
    processes: [ProcessTemplate; 2],
}

struct ProcessTemplate {
    id: &'static str,
    started_hours_ago: i64,
    duration_hours: i64,
    active: bool,
}

const FIXTURE: [EntityTemplate; 2] = [
    EntityTemplate {
        id: "estufa_test",
        broker: "localhost:1883",
        first_sensor: 1,
        processes: [
            ProcessTemplate {
                id: "proc_estufa_test_001",
                started_hours_ago: 3,
                duration_hours: 3,
                active: true,
            },
            ProcessTemplate {
                id: "proc_estufa_test_000",
                started_hours_ago: 28,
                duration_hours: 4,
                active: false,
            },
        ],
    },
    EntityTemplate {
        id: "estufa_1",
        broker: "10.0.0.50:1883",
        first_sensor: 9,
        processes: [
            ProcessTemplate {
                id: "proc_estufa_1_002",
                started_hours_ago: 6,
                duration_hours: 2,
                active: false,
            },
            ProcessTemplate {
                id: "proc_estufa_1_001",
                started_hours_ago: 50,
                duration_hours: 6,
                active: false,
            },
        ],
    },
];

/// Drying-curve parameters drawn once per process.
#[derive(Debug, Clone, Copy)]
struct DryingCurve {
    start_humidity: f64,
    asymptote: f64,
    tau_hours: f64,
    start_battery: f64,
    drain_per_hour: f64,
}

impl DryingCurve {
    fn draw(rng: &mut StdRng) -> Self {
        Self {
            start_humidity: rng.random_range(78.0..85.0),
            asymptote: rng.random_range(45.0..55.0),
            tau_hours: rng.random_range(1.5..4.0),
            start_battery: rng.random_range(90.0..100.0),
            drain_per_hour: rng.random_range(1.0..4.0),
        }
    }

    fn humidity(&self, hours: f64, noise: f64) -> f64 {
        let decay = (self.start_humidity - self.asymptote) * (-hours / self.tau_hours).exp();
        let wave = WAVE_AMPLITUDE * (TAU * hours / WAVE_PERIOD_H).sin();
        (self.asymptote + decay + wave + noise).clamp(0.0, 100.0)
    }

    fn battery(&self, hours: f64) -> f64 {
        (self.start_battery - self.drain_per_hour * hours).clamp(0.0, 100.0)
    }
}

/// Produces the synthetic fixture.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticGenerator {
    seed: Option<u64>,
}

impl SyntheticGenerator {
    /// Fresh random readings on every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identical readings for an identical seed and clock.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn generate<C: Clock + ?Sized>(&self, clock: &C) -> Vec<Entity> {
        let seed = self.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let now = clock.now();
        log::debug!("generating synthetic data (seed {seed})");
        FIXTURE
            .iter()
            .map(|t| Entity {
                id: t.id.to_string(),
                broker: t.broker.to_string(),
                sensors: sensors(&mut rng, now, t.first_sensor),
                processes: t
                    .processes
                    .iter()
                    .map(|p| process(&mut rng, now, p))
                    .collect(),
            })
            .collect()
    }
}

fn iso(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn sensors(rng: &mut StdRng, now: DateTime<Utc>, first: usize) -> Vec<Sensor> {
    (first..first + SENSORS_PER_ENTITY)
        .map(|n| {
            let age_ms = (rng.random::<f64>() * MAX_READING_AGE_MIN * 60_000.0) as i64;
            Sensor {
                sensor_id: format!("ESP32_{n:03}"),
                humidity: Some(round1(rng.random_range(45.0..85.0))),
                battery: Some(rng.random_range(20.0..100.0_f64).floor()),
                timestamp: Some(iso(now - Duration::milliseconds(age_ms))),
                ..Default::default()
            }
        })
        .collect()
}

fn process(rng: &mut StdRng, now: DateTime<Utc>, t: &ProcessTemplate) -> Process {
    let started = now - Duration::hours(t.started_hours_ago);
    let ended = (!t.active).then(|| started + Duration::hours(t.duration_hours));
    let last = ended.unwrap_or(now);
    let curve = DryingCurve::draw(rng);

    let messages: Vec<Message> = (0..MESSAGES_PER_PROCESS)
        .rev()
        .map(|i| {
            let at = last - Duration::minutes(i as i64 * MESSAGE_INTERVAL_MIN);
            let hours = (at - started).num_milliseconds() as f64 / 3_600_000.0;
            let noise = rng.random_range(-NOISE..=NOISE);
            Message {
                id: format!("{}-m{i}", t.id),
                timestamp: Some(iso(at)),
                humidity: Some(round1(curve.humidity(hours, noise))),
                battery: Some(curve.battery(hours).floor()),
            }
        })
        .collect();

    let suffix = t.id.rsplit('_').next().unwrap_or(t.id);
    Process {
        id: t.id.to_string(),
        title: format!("Processo {suffix}"),
        started_at: Some(iso(started)),
        ended_at: ended.map(iso),
        active: t.active,
        summary: summarize(&messages),
        messages,
    }
}

/// Mean humidity and lowest battery over a message history.
pub fn summarize(messages: &[Message]) -> ProcessSummary {
    let humidities: Vec<f64> = messages.iter().filter_map(|m| m.humidity).collect();
    let avg_humidity = (!humidities.is_empty())
        .then(|| round2(humidities.iter().sum::<f64>() / humidities.len() as f64));
    let min_battery = messages
        .iter()
        .filter_map(|m| m.battery)
        .reduce(f64::min);
    ProcessSummary {
        avg_humidity,
        min_battery,
    }
}
