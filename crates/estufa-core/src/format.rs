//! Display formatting for instants and percentages.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};

/// `YYYY-MM-DD HH:MM` in the given zone. Used by tooltips and lists.
pub fn format_calendar<Tz>(ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format_ms(ms, tz, "%Y-%m-%d %H:%M")
}

/// `HH:MM` in the given zone. Used by axis ticks.
pub fn format_clock<Tz>(ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format_ms(ms, tz, "%H:%M")
}

fn format_ms<Tz>(ms: i64, tz: &Tz, fmt: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.with_timezone(tz).format(fmt).to_string(),
        None => "—".to_string(),
    }
}

/// Two-decimal percentage, e.g. `52.40%`.
pub fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}

/// Coarse "time ago" label for `then_ms` relative to `now_ms`.
pub fn format_relative(now_ms: i64, then_ms: i64) -> String {
    let delta_s = (now_ms - then_ms) / 1000;
    let (future, secs) = if delta_s < 0 {
        (true, -delta_s)
    } else {
        (false, delta_s)
    };
    let amount = match secs {
        0..=44 => return "just now".to_string(),
        45..=3599 => format!("{} min", (secs + 30) / 60),
        3600..=86_399 => format!("{} h", (secs + 1800) / 3600),
        _ => format!("{} d", (secs + 43_200) / 86_400),
    };
    if future {
        format!("in {amount}")
    } else {
        format!("{amount} ago")
    }
}

/// Human label for a window duration in milliseconds.
pub fn format_duration_ms(ms: i64) -> String {
    let secs = ms / 1000;
    if secs < 60 {
        format!("{secs} s")
    } else if secs < 3600 {
        format!("{} min", secs / 60)
    } else {
        format!("{} h", secs / 3600)
    }
}
