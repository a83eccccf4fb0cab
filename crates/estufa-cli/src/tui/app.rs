//! TUI application state and event loop.
//!
//! Design: three views over one snapshot (installation list, installation
//! detail, process chart). Polling runs on a background thread so the UI
//! never blocks; the UI thread owns navigation and chart state and picks up
//! new snapshots between frames.

use std::cell::Cell;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::prelude::*;

use estufa_core::chart::SLIDER_MAX;
use estufa_core::{
    ChartGeometry, ChartState, Clock, DashboardConfig, DataSource, Entity, EstufaClient,
    EstufaKpis, FetchOutcome, Navigator, Pointer, Process, SystemClock, View, process_series,
    process_timeline,
};

use super::poller::{Poller, SharedState, lock};
use super::terminal::TerminalGuard;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Virtual pixels per terminal cell. The chart's pixel thresholds (axis
/// gutter, minimum drag) are measured in these units.
pub const CELL_W_PX: f64 = 5.0;
pub const CELL_H_PX: f64 = 10.0;

/// Slider steps per ← / → press.
const SCRUB_STEP: i32 = 25;

// ---------------------------------------------------------------------------
// ChartLayout
// ---------------------------------------------------------------------------

/// Where the process chart landed in the last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartLayout {
    /// Gutter plus plot rows; pointer pixels are measured from its top-left.
    /// The x labels and slider below it are excluded.
    pub area: Rect,
}

impl ChartLayout {
    pub fn geometry(&self) -> ChartGeometry {
        ChartGeometry {
            width: f64::from(self.area.width) * CELL_W_PX,
            height: f64::from(self.area.height) * CELL_H_PX,
        }
    }

    /// Pointer at the centre of a cell, `None` outside the chart area.
    pub fn pointer(&self, col: u16, row: u16) -> Option<Pointer> {
        let a = self.area;
        let inside_cols = col >= a.x && col < a.x + a.width;
        let inside_rows = row >= a.y && row < a.y + a.height;
        if !(inside_cols && inside_rows) {
            return None;
        }
        Some(Pointer::new(
            f64::from(col - a.x) * CELL_W_PX + CELL_W_PX / 2.0,
            f64::from(row - a.y) * CELL_H_PX + CELL_H_PX / 2.0,
        ))
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    client: EstufaClient,
    config: DashboardConfig,
    clock: Arc<dyn Clock>,
    shared: Arc<Mutex<SharedState>>,
    poller: Option<Poller>,
    snapshot: Option<FetchOutcome>,
    updated_at: Option<DateTime<Utc>>,
    seen_cycle: u64,
    fetching: bool,
    nav: Navigator,
    entity_cursor: usize,
    process_cursor: usize,
    chart: Option<ChartState>,
    /// `(entity id, process id)` the chart was built for.
    chart_key: Option<(String, String)>,
    chart_layout: Cell<Option<ChartLayout>>,
    running: bool,
}

impl App {
    pub fn new(client: EstufaClient, config: DashboardConfig) -> Self {
        Self {
            client,
            config,
            clock: Arc::new(SystemClock),
            shared: Arc::new(Mutex::new(SharedState::default())),
            poller: None,
            snapshot: None,
            updated_at: None,
            seen_cycle: 0,
            fetching: true,
            nav: Navigator::new(),
            entity_cursor: 0,
            process_cursor: 0,
            chart: None,
            chart_key: None,
            chart_layout: Cell::new(None),
            running: true,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn run(&mut self) -> io::Result<()> {
        let mut guard = TerminalGuard::enter()?;
        self.poller = Some(Poller::spawn(
            self.client.clone(),
            self.config.refresh_interval(),
            Arc::clone(&self.shared),
        )?);

        let result = self.run_loop(guard.terminal());

        // Hand the terminal back first, then stop and join the poller.
        drop(guard);
        self.poller = None;
        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        while self.running {
            self.sync();
            terminal.draw(|f| super::ui::draw(f, self))?;
            self.sync_geometry();

            if event::poll(Duration::from_millis(50))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key.code)
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    // Layout is recomputed by the next draw.
                    Event::Resize(..) => self.chart_layout.set(None),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Pick up a snapshot the poller published since the last frame.
    fn sync(&mut self) {
        let fresh = {
            let s = lock(&self.shared);
            self.fetching = s.fetching;
            if s.cycle == self.seen_cycle {
                None
            } else {
                self.seen_cycle = s.cycle;
                s.outcome.clone().map(|o| (o, s.updated_at))
            }
        };
        if let Some((outcome, at)) = fresh {
            self.apply_outcome(outcome, at);
        }
    }

    fn sync_geometry(&mut self) {
        if let (Some(layout), Some(chart)) = (self.chart_layout.get(), self.chart.as_mut()) {
            chart.resize(layout.geometry());
        }
    }

    /// Install a new snapshot: drop selections that vanished, keep cursors in
    /// range, feed the open chart.
    pub fn apply_outcome(&mut self, outcome: FetchOutcome, at: Option<DateTime<Utc>>) {
        if self.nav.retain(&outcome.entities) {
            log::info!("selection no longer in snapshot, now at {:?}", self.nav.view());
        }
        self.snapshot = Some(outcome);
        self.updated_at = at;
        self.entity_cursor = self.entity_cursor.min(self.entities().len().saturating_sub(1));
        let n_processes = self.selected_entity().map_or(0, |e| e.processes.len());
        self.process_cursor = self.process_cursor.min(n_processes.saturating_sub(1));
        self.refresh_chart();
    }

    fn refresh_chart(&mut self) {
        let View::Process {
            entity_id,
            process_id,
        } = self.nav.view()
        else {
            self.chart = None;
            self.chart_key = None;
            return;
        };
        let Some(points) = self.selected_process().map(process_timeline) else {
            return;
        };
        let key = (entity_id, process_id);
        if self.chart_key.as_ref() == Some(&key) {
            if let Some(chart) = self.chart.as_mut() {
                chart.set_data(points);
                return;
            }
        }
        let mut chart = ChartState::new(process_series()).with_window(self.config.window_ms);
        if let Some(layout) = self.chart_layout.get() {
            chart.resize(layout.geometry());
        }
        chart.set_data(points);
        self.chart = Some(chart);
        self.chart_key = Some(key);
    }

    // -- input --------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Char('R') => self.request_refresh(),
            KeyCode::Esc | KeyCode::Backspace => self.go_back(),
            _ => match self.nav.view() {
                View::List => self.handle_list_key(key),
                View::Entity { .. } => self.handle_entity_key(key),
                View::Process { .. } => self.handle_chart_key(key),
            },
        }
    }

    fn handle_list_key(&mut self, key: KeyCode) {
        let len = self.entities().len();
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                self.entity_cursor = self.entity_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.entity_cursor + 1 < len {
                    self.entity_cursor += 1;
                }
            }
            KeyCode::Enter => {
                let Some(entity) = self.entities().get(self.entity_cursor) else {
                    return;
                };
                let id = entity.id.clone();
                // Land on the running process when there is one.
                let cursor = entity
                    .processes
                    .iter()
                    .position(|p| p.active)
                    .unwrap_or(0);
                self.process_cursor = cursor;
                self.nav.open_entity(id);
            }
            _ => {}
        }
    }

    fn handle_entity_key(&mut self, key: KeyCode) {
        let len = self.selected_entity().map_or(0, |e| e.processes.len());
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                self.process_cursor = self.process_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.process_cursor + 1 < len {
                    self.process_cursor += 1;
                }
            }
            KeyCode::Enter => {
                let id = self
                    .selected_entity()
                    .and_then(|e| e.processes.get(self.process_cursor))
                    .map(|p| p.id.clone());
                if let Some(id) = id {
                    self.nav.open_process(id);
                    self.refresh_chart();
                }
            }
            _ => {}
        }
    }

    fn handle_chart_key(&mut self, key: KeyCode) {
        let Some(chart) = self.chart.as_mut() else {
            return;
        };
        match key {
            KeyCode::Char('f') => chart.toggle_follow(),
            KeyCode::Char('r') => chart.reset(),
            KeyCode::Char('w') => chart.cycle_window(),
            KeyCode::Char('y') => chart.y_full(),
            KeyCode::Char('a') => chart.y_auto(),
            KeyCode::Char('F') => {
                chart.fit();
            }
            KeyCode::Char(c @ '1'..='9') => {
                let idx = c as usize - '1' as usize;
                chart.toggle_series_at(idx);
            }
            KeyCode::Left => chart.scrub_by(-SCRUB_STEP),
            KeyCode::Right => chart.scrub_by(SCRUB_STEP),
            KeyCode::Home => chart.scrub(0),
            KeyCode::End => chart.scrub(SLIDER_MAX),
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let (Some(layout), Some(chart)) = (self.chart_layout.get(), self.chart.as_mut()) else {
            return;
        };
        chart.resize(layout.geometry());
        let Some(p) = layout.pointer(mouse.column, mouse.row) else {
            chart.pointer_leave();
            return;
        };
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => chart.pointer_down(p),
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                chart.pointer_move(p)
            }
            MouseEventKind::Up(MouseButton::Left) => {
                chart.pointer_move(p);
                chart.pointer_up();
            }
            _ => {}
        }
    }

    fn go_back(&mut self) {
        if self.nav.back() {
            self.refresh_chart();
        }
    }

    fn request_refresh(&self) {
        if let Some(poller) = &self.poller {
            poller.refresh();
        }
    }

    // -- accessors for ui ---------------------------------------------------

    pub fn view(&self) -> View {
        self.nav.view()
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot.is_none()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn source(&self) -> Option<DataSource> {
        self.snapshot.as_ref().map(|s| s.source)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn entities(&self) -> &[Entity] {
        self.snapshot
            .as_ref()
            .map_or(&[][..], |s| s.entities.as_slice())
    }

    pub fn entity_cursor(&self) -> usize {
        self.entity_cursor
    }

    pub fn process_cursor(&self) -> usize {
        self.process_cursor
    }

    pub fn selected_entity(&self) -> Option<&Entity> {
        self.nav.resolve(self.entities()).0
    }

    pub fn selected_process(&self) -> Option<&Process> {
        self.nav.resolve(self.entities()).1
    }

    pub fn kpis(&self, entity: &Entity) -> EstufaKpis {
        EstufaKpis::compute(entity, self.clock.as_ref(), self.config.inactive_threshold())
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn inactive_threshold(&self) -> Duration {
        self.config.inactive_threshold()
    }

    pub fn chart(&self) -> Option<&ChartState> {
        self.chart.as_ref()
    }

    pub fn set_chart_layout(&self, layout: ChartLayout) {
        self.chart_layout.set(Some(layout));
    }
}
