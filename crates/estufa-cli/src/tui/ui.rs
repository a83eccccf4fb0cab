//! TUI rendering: list → detail → process chart.
//!
//! ┌──────────────────────────────────────────────┐
//! │  🌱 Estufa   estufa_test › Processo 001  live │
//! ├──────────────────────────────────────────────┤
//! │  2024-04-02 09:45  Humidity 52.40%  ...      │
//! │ 100.00% ┊    ╭─╮                              │
//! │         ┊ ───╯ ╰──────────                   │
//! │   0.00% ┊                                     │
//! │         09:50        09:55          10:00     │
//! │  ──────────────────────────●  10 min  follow  │
//! ├──────────────────────────────────────────────┤
//! │  f follow  r reset  w window  ...   q quit    │
//! └──────────────────────────────────────────────┘

use chrono::Local;
use ratatui::{prelude::*, widgets::*};

use estufa_core::chart::{SLIDER_MAX, Y_AXIS_MARGIN_PX};
use estufa_core::format::{format_calendar, format_percent, format_relative};
use estufa_core::metrics::is_inactive;
use estufa_core::{ChartState, DataSource, Emphasis, Entity, SelectionBand, View, parse_instant_ms};

use super::app::{App, CELL_W_PX, ChartLayout};

/// Columns of the y-axis gutter.
const GUTTER_COLS: u16 = (Y_AXIS_MARGIN_PX / CELL_W_PX) as u16;

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(10),   // main
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app);
    if app.is_loading() {
        let p = Paragraph::new("Fetching installations…")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(p, rows[1]);
    } else {
        match app.view() {
            View::List => draw_list(f, rows[1], app),
            View::Entity { .. } => draw_entity(f, rows[1], app),
            View::Process { .. } => draw_process(f, rows[1], app),
        }
    }
    draw_keys(f, rows[2], &app.view());
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let mut crumbs = String::new();
    if let Some(e) = app.selected_entity() {
        crumbs.push_str(&e.id);
    }
    if let Some(p) = app.selected_process() {
        crumbs.push_str(" › ");
        crumbs.push_str(p.display_title());
    }

    let source = match app.source() {
        Some(DataSource::Live) => Span::styled(" live ", Style::default().bold().fg(Color::Green)),
        Some(DataSource::Synthetic) => {
            Span::styled(" synthetic ", Style::default().bold().fg(Color::Yellow))
        }
        None => Span::raw(""),
    };
    let updated = app
        .updated_at()
        .map(|t| format!("  updated {}", t.with_timezone(&Local).format("%H:%M:%S")))
        .unwrap_or_default();
    let spin = if app.is_fetching() { " ⟳" } else { "" };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(Line::from(vec![
            Span::styled(" 🌱 Estufa ", Style::default().bold().fg(Color::Green)),
            Span::styled(format!(" {crumbs} "), Style::default().bold().fg(Color::Yellow)),
            source,
            Span::styled(format!("{updated}{spin} "), Style::default().fg(Color::DarkGray)),
        ]));

    f.render_widget(block, area);
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

fn draw_list(f: &mut Frame, area: Rect, app: &App) {
    let entities = app.entities();
    if entities.is_empty() {
        let p = Paragraph::new("No installations in this snapshot")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(" Estufas "));
        f.render_widget(p, area);
        return;
    }

    let rows: Vec<Row> = entities
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let k = app.kpis(e);
            let is_cursor = i == app.entity_cursor();
            let pointer = if is_cursor { "▸" } else { " " };
            let process = match e.active_process() {
                Some(p) => format!("● {}", p.display_title()),
                None => "—".into(),
            };
            let style = if is_cursor {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else if k.inactive_count > 0 {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Row::new(vec![
                pointer.to_string(),
                e.id.clone(),
                e.broker.clone(),
                k.sensor_count.to_string(),
                format_percent(k.humidity_average),
                format_percent(k.min_battery),
                format!("{}/{}", k.inactive_count, k.sensor_count),
                process,
            ])
            .style(style)
        })
        .collect();

    let header = Row::new(vec![
        "", "ID", "Broker", "Sensors", "Humidity", "Battery", "Inactive", "Process",
    ])
    .style(Style::default().bold().fg(Color::Cyan));

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),  // pointer
            Constraint::Length(16), // id
            Constraint::Length(18), // broker
            Constraint::Length(8),  // sensors
            Constraint::Length(9),  // humidity
            Constraint::Length(8),  // battery
            Constraint::Length(9),  // inactive
            Constraint::Min(12),    // process
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Estufas (enter to open) "),
    );

    f.render_widget(table, area);
}

// ---------------------------------------------------------------------------
// Entity detail
// ---------------------------------------------------------------------------

fn draw_entity(f: &mut Frame, area: Rect, app: &App) {
    let Some(entity) = app.selected_entity() else {
        return;
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(6)])
        .split(area);

    draw_kpis(f, rows[0], app, entity);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);
    draw_sensors(f, cols[0], app, entity);
    draw_processes(f, cols[1], app, entity);
}

fn draw_kpis(f: &mut Frame, area: Rect, app: &App, entity: &Entity) {
    let k = app.kpis(entity);
    let battery_style = if k.min_battery < 25.0 {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Green)
    };
    let inactive_style = if k.inactive_count > 0 {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Green)
    };
    let running = match entity.active_process() {
        Some(p) => Span::styled(
            format!("running: {}", p.display_title()),
            Style::default().fg(Color::Cyan),
        ),
        None => Span::styled("idle", Style::default().fg(Color::DarkGray)),
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Avg humidity ", Style::default().bold()),
            Span::raw(format_percent(k.humidity_average)),
            Span::styled("   Min battery ", Style::default().bold()),
            Span::styled(format_percent(k.min_battery), battery_style),
            Span::styled("   Inactive ", Style::default().bold()),
            Span::styled(
                format!("{}/{}", k.inactive_count, k.sensor_count),
                inactive_style,
            ),
        ]),
        Line::from(vec![
            Span::styled(format!("broker {}   ", entity.broker), Style::default().fg(Color::DarkGray)),
            running,
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", entity.id));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_sensors(f: &mut Frame, area: Rect, app: &App, entity: &Entity) {
    let now = app.now_ms();
    let threshold = app.inactive_threshold();

    let rows: Vec<Row> = entity
        .sensors
        .iter()
        .map(|s| {
            let (marker, style) = if !s.is_active() {
                ("○", Style::default().fg(Color::DarkGray))
            } else if is_inactive(s, now, threshold) {
                ("●", Style::default().fg(Color::Red))
            } else {
                ("●", Style::default().fg(Color::Green))
            };
            let last_seen = s
                .reading_time()
                .and_then(parse_instant_ms)
                .map(|t| format_relative(now, t))
                .unwrap_or_else(|| "—".into());
            Row::new(vec![
                Cell::from(marker).style(style),
                Cell::from(s.display_name().to_string()),
                Cell::from(s.display_humidity().map_or_else(|| "—".into(), format_percent)),
                Cell::from(format_percent(s.battery_or_default())),
                Cell::from(last_seen),
            ])
        })
        .collect();

    let header = Row::new(vec!["", "Sensor", "Humidity", "Battery", "Last seen"])
        .style(Style::default().bold().fg(Color::Cyan));
    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Min(10),
            Constraint::Length(9),
            Constraint::Length(8),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Sensors ({}) ", entity.sensors.len())),
    );
    f.render_widget(table, area);
}

fn draw_processes(f: &mut Frame, area: Rect, app: &App, entity: &Entity) {
    let when = |ts: Option<&str>| {
        ts.and_then(parse_instant_ms)
            .map(|ms| format_calendar(ms, &Local))
            .unwrap_or_else(|| "—".into())
    };

    let items: Vec<ListItem> = entity
        .processes
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let is_cursor = i == app.process_cursor();
            let pointer = if is_cursor { "▸ " } else { "  " };
            let status = if p.is_ongoing() {
                Span::styled("running", Style::default().fg(Color::Cyan))
            } else {
                Span::styled(
                    format!("ended {}", when(p.ended_at.as_deref())),
                    Style::default().fg(Color::DarkGray),
                )
            };
            let summary = format!(
                "avg {}  min bat {}",
                p.summary
                    .avg_humidity
                    .map_or_else(|| "—".into(), format_percent),
                p.summary
                    .min_battery
                    .map_or_else(|| "—".into(), format_percent),
            );
            let title_style = if is_cursor {
                Style::default().bold().fg(Color::Yellow)
            } else {
                Style::default().bold()
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::raw(pointer),
                    Span::styled(p.display_title().to_string(), title_style),
                    Span::raw("  "),
                    status,
                ]),
                Line::from(format!(
                    "    started {}  {summary}",
                    when(p.started_at.as_deref())
                ))
                .style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Processes (enter to chart) "),
    );
    f.render_widget(list, area);
}

// ---------------------------------------------------------------------------
// Process chart
// ---------------------------------------------------------------------------

fn draw_process(f: &mut Frame, area: Rect, app: &App) {
    let (Some(process), Some(chart)) = (app.selected_process(), app.chart()) else {
        return;
    };

    let legend: Vec<Span> = chart
        .series()
        .iter()
        .enumerate()
        .flat_map(|(i, s)| {
            let color = series_color(s.color, chart.emphasis(&s.key));
            [
                Span::raw(format!(" {} ", i + 1)),
                Span::styled(format!("━ {}", s.label), Style::default().fg(color)),
            ]
        })
        .collect();
    let follow = if chart.is_following() {
        Span::styled("  ● follow ", Style::default().fg(Color::Green))
    } else {
        Span::styled("  ○ paused ", Style::default().fg(Color::DarkGray))
    };
    let mut title = vec![Span::styled(
        format!(" {} ", process.display_title()),
        Style::default().bold().fg(Color::Cyan),
    )];
    title.extend(legend);
    title.push(Span::raw(format!("   window {}", chart.window_label())));
    title.push(follow);

    let block = Block::default().borders(Borders::ALL).title(Line::from(title));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // tooltip
            Constraint::Min(3),    // plot
            Constraint::Length(1), // x labels
            Constraint::Length(1), // slider
        ])
        .split(inner);

    app.set_chart_layout(ChartLayout { area: rows[1] });

    draw_readout(f, rows[0], chart);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(GUTTER_COLS), Constraint::Min(1)])
        .split(rows[1]);
    draw_y_labels(f, cols[0], chart);
    draw_plot(f, cols[1], chart);
    draw_x_labels(f, rows[2], chart);
    draw_slider(f, rows[3], chart);
}

fn draw_readout(f: &mut Frame, area: Rect, chart: &ChartState) {
    let line = if let Some(band) = chart.selection_band() {
        let text = match band {
            SelectionBand::Time { start, end } => format!(
                "zoom {} → {}",
                format_calendar(start as i64, &Local),
                format_calendar(end as i64, &Local)
            ),
            SelectionBand::Value { min, max } => {
                format!("zoom {} → {}", format_percent(min), format_percent(max))
            }
        };
        Line::from(Span::styled(text, Style::default().fg(Color::Magenta)))
    } else if let Some(tip) = chart.tooltip(&Local) {
        let mut spans = vec![Span::styled(tip.time_label, Style::default().bold())];
        for (label, value) in tip.values {
            spans.push(Span::raw(format!("   {label} {value}")));
        }
        Line::from(spans)
    } else if chart.points().is_empty() {
        Line::from(Span::styled(
            "No messages for this process",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(Span::styled(
            "drag to zoom time · drag the left gutter to zoom values",
            Style::default().fg(Color::DarkGray),
        ))
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw_y_labels(f: &mut Frame, area: Rect, chart: &ChartState) {
    let labels = chart.y_labels(3);
    let height = area.height as usize;
    let mut lines = vec![Line::from(""); height];
    if height > 0 {
        // labels ascend; screen rows descend
        lines[0] = Line::from(labels[2].clone());
        lines[height / 2] = Line::from(labels[1].clone());
        lines[height - 1] = Line::from(labels[0].clone());
    }
    let p = Paragraph::new(lines)
        .alignment(Alignment::Right)
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(p, area);
}

fn draw_plot(f: &mut Frame, area: Rect, chart: &ChartState) {
    let Some((x0, x1)) = chart.visible_x() else {
        return;
    };
    let (y0, y1) = chart.visible_y();
    let (x0, x1) = (x0 as f64, (x1.max(x0 + 1)) as f64);

    let order = chart.draw_order();
    let series: Vec<Vec<(f64, f64)>> = order.iter().map(|s| chart.series_data(&s.key)).collect();
    let band: Vec<Vec<(f64, f64)>> = match chart.selection_band() {
        Some(SelectionBand::Time { start, end }) => {
            vec![vec![(start, y0), (start, y1)], vec![(end, y0), (end, y1)]]
        }
        Some(SelectionBand::Value { min, max }) => {
            vec![vec![(x0, min), (x1, min)], vec![(x0, max), (x1, max)]]
        }
        None => Vec::new(),
    };

    let mut datasets: Vec<Dataset> = band
        .iter()
        .map(|edge| {
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Magenta))
                .data(edge)
        })
        .collect();
    // secondary series first, main series last
    for (spec, data) in order.iter().zip(&series) {
        let marker = if spec.main {
            symbols::Marker::Braille
        } else {
            symbols::Marker::Dot
        };
        datasets.push(
            Dataset::default()
                .marker(marker)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(series_color(spec.color, chart.emphasis(&spec.key))))
                .data(data),
        );
    }

    let plot = Chart::new(datasets)
        .x_axis(Axis::default().bounds([x0, x1]))
        .y_axis(Axis::default().bounds([y0, y1]));
    f.render_widget(plot, area);
}

fn draw_x_labels(f: &mut Frame, area: Rect, chart: &ChartState) {
    let labels = chart.x_labels(&Local, 3);
    if labels.len() < 3 {
        return;
    }
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(GUTTER_COLS),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);
    let style = Style::default().fg(Color::DarkGray);
    for (i, align) in [Alignment::Left, Alignment::Center, Alignment::Right]
        .into_iter()
        .enumerate()
    {
        let p = Paragraph::new(labels[i].clone())
            .alignment(align)
            .style(style);
        f.render_widget(p, cols[i + 1]);
    }
}

fn draw_slider(f: &mut Frame, area: Rect, chart: &ChartState) {
    let ratio = f64::from(chart.slider()) / f64::from(SLIDER_MAX);
    let gauge = LineGauge::default()
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("{:>3}% ", (ratio * 100.0).round()))
        .filled_style(Style::default().fg(Color::Cyan))
        .unfilled_style(Style::default().fg(Color::DarkGray));
    f.render_widget(gauge, area);
}

fn series_color((r, g, b): (u8, u8, u8), emphasis: Emphasis) -> Color {
    match emphasis {
        Emphasis::Full => Color::Rgb(r, g, b),
        Emphasis::Dimmed => Color::Rgb(r / 4, g / 4, b / 4),
    }
}

// ---------------------------------------------------------------------------
// Key bar
// ---------------------------------------------------------------------------

fn draw_keys(f: &mut Frame, area: Rect, view: &View) {
    let keys = match view {
        View::List => " ↑↓ navigate   enter: open   R: refetch   q: quit",
        View::Entity { .. } => " ↑↓ navigate   enter: chart   esc: back   R: refetch   q: quit",
        View::Process { .. } => {
            " f follow  r reset  w window  y 0-100  a auto  F fit  1-9 series  ←→ scrub  esc back  q quit"
        }
    };
    let bar = Paragraph::new(keys).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}

