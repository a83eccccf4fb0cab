//! Interactive time-series chart state.
//!
//! One [`ChartState`] per chart instance. It owns the normalized points and
//! every piece of interaction state: the x and y domains, live-follow, the
//! follow window, which series are emphasised, the drag-to-zoom gesture, the
//! scrub slider, and the hover position for tooltips.
//!
//! Pointer coordinates are pixels relative to the chart's top-left corner.
//! The leftmost [`Y_AXIS_MARGIN_PX`] pixels are the y-axis gutter: a drag
//! starting there zooms values, anywhere else it zooms time.
//!
//! ```text
//!  0      40px                                  width
//!  ┌───────┬──────────────────────────────────────┐ 0
//!  │ y     │                                      │
//!  │ axis  │          plot (time →)               │
//!  │ drag  │          drag = time zoom            │
//!  └───────┴──────────────────────────────────────┘ height
//! ```

use std::collections::BTreeSet;
use std::fmt::Display;

use chrono::TimeZone;

use crate::format::{format_calendar, format_clock, format_duration_ms, format_percent};
use crate::series::{SeriesSpec, TimePoint};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Follow windows the user can pick from, in milliseconds.
pub const WINDOW_PRESETS: [i64; 6] = [
    60_000,     // 1 min
    600_000,    // 10 min
    1_800_000,  // 30 min
    3_600_000,  // 1 h
    18_000_000, // 5 h
    72_000_000, // 20 h
];

pub const DEFAULT_WINDOW_MS: i64 = 600_000;

/// Upper end of the scrub slider.
pub const SLIDER_MAX: u16 = 1000;

/// Width of the y-axis gutter.
pub const Y_AXIS_MARGIN_PX: f64 = 40.0;

/// Drags shorter than these are clicks, not zooms.
pub const MIN_X_DRAG_PX: f64 = 10.0;
pub const MIN_Y_DRAG_PX: f64 = 5.0;

/// Value range rendered while the y domain is automatic (all series are
/// percentages).
pub const AUTO_Y_RANGE: (f64, f64) = (0.0, 100.0);

// ---------------------------------------------------------------------------
// Domains and gestures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XDomain {
    /// Fit the full data extent.
    #[default]
    Auto,
    /// Explicit `[start, end]` in epoch milliseconds.
    Window { start: i64, end: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum YDomain {
    #[default]
    Auto,
    Range { min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureAxis {
    X,
    Y,
}

/// An in-progress drag. Positions are pixels along the gesture's axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub axis: GestureAxis,
    pub start_px: f64,
    pub current_px: f64,
}

impl Selection {
    pub fn distance(&self) -> f64 {
        (self.current_px - self.start_px).abs()
    }

    fn min_distance(&self) -> f64 {
        match self.axis {
            GestureAxis::X => MIN_X_DRAG_PX,
            GestureAxis::Y => MIN_Y_DRAG_PX,
        }
    }
}

/// The selection band in data coordinates, for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionBand {
    Time { start: f64, end: f64 },
    Value { min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

impl Pointer {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Chart size in pixels, y-axis gutter included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartGeometry {
    pub width: f64,
    pub height: f64,
}

impl Default for ChartGeometry {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 300.0,
        }
    }
}

impl ChartGeometry {
    fn plot_width(&self) -> f64 {
        (self.width - Y_AXIS_MARGIN_PX).max(1.0)
    }

    fn plot_height(&self) -> f64 {
        self.height.max(1.0)
    }
}

/// Whether a series is drawn at full strength or dimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Full,
    Dimmed,
}

/// Hover readout for the point nearest the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub time_ms: i64,
    pub time_label: String,
    /// `(series label, formatted value)` in draw order.
    pub values: Vec<(String, String)>,
}

// ---------------------------------------------------------------------------
// ChartState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ChartState {
    series: Vec<SeriesSpec>,
    points: Vec<TimePoint>,
    x_domain: XDomain,
    y_domain: YDomain,
    follow: bool,
    window_ms: i64,
    selected: BTreeSet<String>,
    selecting: Option<Selection>,
    slider: u16,
    geometry: ChartGeometry,
    hover: Option<Pointer>,
}

impl ChartState {
    /// A chart over `series`, following live data with the default window.
    ///
    /// Main series start selected; if none is marked main, all are.
    pub fn new(series: Vec<SeriesSpec>) -> Self {
        let mut selected: BTreeSet<String> = series
            .iter()
            .filter(|s| s.main)
            .map(|s| s.key.clone())
            .collect();
        if selected.is_empty() {
            selected = series.iter().map(|s| s.key.clone()).collect();
        }
        Self {
            series,
            points: Vec::new(),
            x_domain: XDomain::Auto,
            y_domain: YDomain::Auto,
            follow: true,
            window_ms: DEFAULT_WINDOW_MS,
            selected,
            selecting: None,
            slider: SLIDER_MAX,
            geometry: ChartGeometry::default(),
            hover: None,
        }
    }

    pub fn with_window(mut self, window_ms: i64) -> Self {
        self.window_ms = window_ms.max(1);
        self.apply_follow();
        self
    }

    pub fn with_follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self.apply_follow();
        self
    }

    // -- accessors ----------------------------------------------------------

    pub fn series(&self) -> &[SeriesSpec] {
        &self.series
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn x_domain(&self) -> XDomain {
        self.x_domain
    }

    pub fn y_domain(&self) -> YDomain {
        self.y_domain
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    pub fn window_label(&self) -> String {
        format_duration_ms(self.window_ms)
    }

    pub fn slider(&self) -> u16 {
        self.slider
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selecting
    }

    pub fn geometry(&self) -> ChartGeometry {
        self.geometry
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected.contains(key)
    }

    pub fn emphasis(&self, key: &str) -> Emphasis {
        if self.is_selected(key) {
            Emphasis::Full
        } else {
            Emphasis::Dimmed
        }
    }

    /// Secondary series first, main series last, so the main line sits on top.
    pub fn draw_order(&self) -> Vec<&SeriesSpec> {
        self.series
            .iter()
            .filter(|s| !s.main)
            .chain(self.series.iter().filter(|s| s.main))
            .collect()
    }

    pub fn data_extent(&self) -> Option<(i64, i64)> {
        TimePoint::extent(&self.points)
    }

    /// Time range currently rendered. `None` while there is no data and no
    /// explicit window.
    pub fn visible_x(&self) -> Option<(i64, i64)> {
        match self.x_domain {
            XDomain::Auto => self.data_extent(),
            XDomain::Window { start, end } => Some((start, end)),
        }
    }

    /// Value range currently rendered. A degenerate range is widened by one
    /// unit on each side.
    pub fn visible_y(&self) -> (f64, f64) {
        let (min, max) = match self.y_domain {
            YDomain::Auto => AUTO_Y_RANGE,
            YDomain::Range { min, max } => (min, max),
        };
        if max - min < f64::EPSILON {
            (min - 1.0, max + 1.0)
        } else {
            (min, max)
        }
    }

    /// Points inside the visible time range.
    pub fn visible_points(&self) -> &[TimePoint] {
        let Some((start, end)) = self.visible_x() else {
            return &[];
        };
        let lo = self.points.partition_point(|p| p.time_ms < start);
        let hi = self.points.partition_point(|p| p.time_ms <= end);
        if lo >= hi { &[] } else { &self.points[lo..hi] }
    }

    /// `(time_ms, value)` pairs of one series within the visible range.
    pub fn series_data(&self, key: &str) -> Vec<(f64, f64)> {
        self.visible_points()
            .iter()
            .filter_map(|p| p.value(key).map(|v| (p.time_ms as f64, v)))
            .collect()
    }

    // -- data and follow ----------------------------------------------------

    /// Replace the data. While following, the window jumps to the newest point.
    pub fn set_data(&mut self, points: Vec<TimePoint>) {
        self.points = points;
        self.apply_follow();
    }

    fn apply_follow(&mut self) {
        if !self.follow {
            return;
        }
        if let Some((min, max)) = self.data_extent() {
            let start = min.max(max - self.window_ms);
            self.x_domain = XDomain::Window { start, end: max };
            self.slider = SLIDER_MAX;
        }
    }

    pub fn set_follow(&mut self, follow: bool) {
        self.follow = follow;
        self.apply_follow();
    }

    pub fn toggle_follow(&mut self) {
        self.set_follow(!self.follow);
    }

    /// Change the follow window. A paused explicit window keeps its left edge.
    pub fn set_window(&mut self, window_ms: i64) {
        self.window_ms = window_ms.max(1);
        if self.follow {
            self.apply_follow();
        } else if let XDomain::Window { start, .. } = self.x_domain {
            self.x_domain = XDomain::Window {
                start,
                end: start + self.window_ms,
            };
        }
    }

    /// Step to the next entry of [`WINDOW_PRESETS`], wrapping around.
    pub fn cycle_window(&mut self) {
        let next = WINDOW_PRESETS
            .iter()
            .copied()
            .find(|&w| w > self.window_ms)
            .unwrap_or(WINDOW_PRESETS[0]);
        self.set_window(next);
    }

    /// Move the window along the data. `pct` is clamped to `0..=SLIDER_MAX`.
    pub fn scrub(&mut self, pct: u16) {
        let pct = pct.min(SLIDER_MAX);
        self.slider = pct;
        self.follow = false;
        let Some((min, max)) = self.data_extent() else {
            return;
        };
        let max_start = (max - min - self.window_ms).max(0);
        let offset = (f64::from(pct) / f64::from(SLIDER_MAX) * max_start as f64).round() as i64;
        let start = min + offset;
        self.x_domain = XDomain::Window {
            start,
            end: max.min(start + self.window_ms),
        };
    }

    /// Nudge the slider by `delta` steps.
    pub fn scrub_by(&mut self, delta: i32) {
        let pct = (i32::from(self.slider) + delta).clamp(0, i32::from(SLIDER_MAX));
        self.scrub(pct as u16);
    }

    // -- domains ------------------------------------------------------------

    /// Both domains back to automatic, follow back on.
    pub fn reset(&mut self) {
        self.x_domain = XDomain::Auto;
        self.y_domain = YDomain::Auto;
        self.follow = true;
        self.apply_follow();
    }

    /// Fix the y domain to the full percentage range.
    pub fn y_full(&mut self) {
        self.y_domain = YDomain::Range {
            min: 0.0,
            max: 100.0,
        };
    }

    pub fn y_auto(&mut self) {
        self.y_domain = YDomain::Auto;
    }

    /// Rescale y to the selected series inside the visible time range.
    /// Returns `false` (and changes nothing) when nothing is visible.
    pub fn fit(&mut self) -> bool {
        let values = self.visible_points().iter().flat_map(|p| {
            self.selected
                .iter()
                .filter_map(move |key| p.value(key))
        });
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !min.is_finite() || !max.is_finite() {
            return false;
        }
        self.y_domain = YDomain::Range {
            min: min.floor(),
            max: max.ceil(),
        };
        true
    }

    // -- series -------------------------------------------------------------

    /// Toggle emphasis of a known series. Unknown keys are ignored.
    pub fn toggle_series(&mut self, key: &str) -> bool {
        if !self.series.iter().any(|s| s.key == key) {
            return false;
        }
        if !self.selected.remove(key) {
            self.selected.insert(key.to_string());
        }
        true
    }

    /// Toggle the `index`-th series in declaration order.
    pub fn toggle_series_at(&mut self, index: usize) -> bool {
        match self.series.get(index).map(|s| s.key.clone()) {
            Some(key) => self.toggle_series(&key),
            None => false,
        }
    }

    // -- pointer ------------------------------------------------------------

    pub fn resize(&mut self, geometry: ChartGeometry) {
        self.geometry = geometry;
    }

    pub fn pointer_down(&mut self, p: Pointer) {
        self.hover = Some(p);
        self.selecting = Some(if p.x <= Y_AXIS_MARGIN_PX {
            Selection {
                axis: GestureAxis::Y,
                start_px: p.y,
                current_px: p.y,
            }
        } else {
            Selection {
                axis: GestureAxis::X,
                start_px: p.x,
                current_px: p.x,
            }
        });
    }

    pub fn pointer_move(&mut self, p: Pointer) {
        self.hover = Some(p);
        if let Some(sel) = self.selecting.as_mut() {
            sel.current_px = match sel.axis {
                GestureAxis::X => p.x,
                GestureAxis::Y => p.y,
            };
        }
    }

    /// Finish the gesture. Returns `true` if it changed a domain.
    pub fn pointer_up(&mut self) -> bool {
        let Some(sel) = self.selecting.take() else {
            return false;
        };
        if sel.distance() <= sel.min_distance() {
            return false;
        }
        match sel.axis {
            GestureAxis::X => {
                let (Some(a), Some(b)) = (self.px_to_time(sel.start_px), self.px_to_time(sel.current_px))
                else {
                    return false;
                };
                self.x_domain = XDomain::Window {
                    start: a.min(b).round() as i64,
                    end: a.max(b).round() as i64,
                };
                self.follow = false;
            }
            GestureAxis::Y => {
                let a = self.px_to_value(sel.start_px);
                let b = self.px_to_value(sel.current_px);
                self.y_domain = YDomain::Range {
                    min: a.min(b),
                    max: a.max(b),
                };
            }
        }
        true
    }

    /// Pointer left the chart: drop the gesture and the hover.
    pub fn pointer_leave(&mut self) {
        self.selecting = None;
        self.hover = None;
    }

    /// Invert an x pixel to a time through the rendered time range.
    pub fn px_to_time(&self, px: f64) -> Option<f64> {
        let (start, end) = self.visible_x()?;
        let ratio = ((px - Y_AXIS_MARGIN_PX) / self.geometry.plot_width()).clamp(0.0, 1.0);
        Some(start as f64 + ratio * (end - start) as f64)
    }

    /// Invert a y pixel to a value through the rendered value range.
    pub fn px_to_value(&self, py: f64) -> f64 {
        let h = self.geometry.plot_height();
        let ratio = (h - py.clamp(0.0, h)) / h;
        let (min, max) = self.visible_y();
        min + ratio * (max - min)
    }

    /// The in-progress selection in data coordinates.
    pub fn selection_band(&self) -> Option<SelectionBand> {
        let sel = self.selecting?;
        match sel.axis {
            GestureAxis::X => {
                let a = self.px_to_time(sel.start_px)?;
                let b = self.px_to_time(sel.current_px)?;
                Some(SelectionBand::Time {
                    start: a.min(b),
                    end: a.max(b),
                })
            }
            GestureAxis::Y => {
                let a = self.px_to_value(sel.start_px);
                let b = self.px_to_value(sel.current_px);
                Some(SelectionBand::Value {
                    min: a.min(b),
                    max: a.max(b),
                })
            }
        }
    }

    // -- labels -------------------------------------------------------------

    /// Readout for the visible point closest to the hovered time.
    pub fn tooltip<Tz>(&self, tz: &Tz) -> Option<Tooltip>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let hover = self.hover?;
        if hover.x <= Y_AXIS_MARGIN_PX {
            return None;
        }
        let t = self.px_to_time(hover.x)?;
        let nearest = self
            .visible_points()
            .iter()
            .min_by(|a, b| {
                let da = (a.time_ms as f64 - t).abs();
                let db = (b.time_ms as f64 - t).abs();
                da.total_cmp(&db)
            })?;
        let values = self
            .draw_order()
            .into_iter()
            .rev()
            .filter_map(|s| nearest.value(&s.key).map(|v| (s.label.clone(), format_percent(v))))
            .collect();
        Some(Tooltip {
            time_ms: nearest.time_ms,
            time_label: format_calendar(nearest.time_ms, tz),
            values,
        })
    }

    /// `count` evenly spaced clock labels across the visible time range.
    pub fn x_labels<Tz>(&self, tz: &Tz, count: usize) -> Vec<String>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let Some((start, end)) = self.visible_x() else {
            return Vec::new();
        };
        spaced(start as f64, end as f64, count)
            .map(|t| format_clock(t.round() as i64, tz))
            .collect()
    }

    /// `count` evenly spaced percentage labels across the visible value range.
    pub fn y_labels(&self, count: usize) -> Vec<String> {
        let (min, max) = self.visible_y();
        spaced(min, max, count).map(format_percent).collect()
    }
}

fn spaced(start: f64, end: f64, count: usize) -> impl Iterator<Item = f64> {
    let steps = count.max(2) - 1;
    (0..=steps).map(move |i| start + (end - start) * i as f64 / steps as f64)
}
