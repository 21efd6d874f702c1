use chrono::Local;
use ratatui::{
    prelude::*,
    symbols::Marker as CanvasMarker,
    widgets::{
        Block, Borders, Cell, Gauge, List, ListItem, Paragraph, Row, Table, TableState, Tabs, Wrap,
        canvas::{Canvas, Line as CanvasLine, Points},
    },
};
use wastewatch_core::format::{format_bytes, format_load, format_uptime, memory_usage_pct};
use wastewatch_core::icon::{MarkerColor, route_status_badge};
use wastewatch_core::surface::PathNote;
use wastewatch_core::{ACTIVE_ROUTES_PREVIEW, GeoPoint, RECENT_ITEMS, Route};

use crate::app::{App, Screen};

/// Map center used when nothing has a location yet.
const FALLBACK_CENTER: GeoPoint = GeoPoint {
    lat: 36.8065,
    lon: 10.1815,
};

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: tabs, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    let selected = Screen::ALL
        .iter()
        .position(|screen| *screen == app.screen)
        .unwrap_or_default();
    let titles = Screen::ALL
        .iter()
        .enumerate()
        .map(|(idx, screen)| format!("{} {}", idx + 1, screen.title()));
    let header = Tabs::new(titles)
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("wastewatch – smart waste management"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(header, *header_area);

    match app.screen {
        Screen::Dashboard => draw_dashboard(frame, app, *content_area),
        Screen::Map => draw_map(frame, app, *content_area),
        Screen::Monitor => draw_monitor(frame, app, *content_area),
        Screen::Statistics => draw_statistics(frame, app, *content_area),
    }

    draw_status(frame, app, *status_area);
}

fn draw_status(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let nav_hint = match app.screen {
        Screen::Dashboard => {
            "↑/↓ route · g generate · a advance · d delete · m more · e export · r reload · \
             Tab/1-4 screens · q quit"
        }
        Screen::Map => "n/→ next route · r reload · e export · Tab/1-4 screens · q quit",
        Screen::Monitor => "Refreshes on its own · e export · Tab/1-4 screens · q quit",
        Screen::Statistics => "r reload · e export · Tab/1-4 screens · q quit",
    };

    let (status_text, status_style) = if let Some(route) = &app.pending_delete {
        (
            format!("Delete route {route}? y confirms, any other key cancels"),
            Style::default().fg(Color::Yellow),
        )
    } else if app.busy() {
        (
            format!("Loading… · {nav_hint}"),
            Style::default().fg(Color::Yellow),
        )
    } else if let Some(msg) = app.current_error() {
        (format!("{msg} · {nav_hint}"), Style::default().fg(Color::Red))
    } else if let Some(msg) = &app.notice {
        (format!("{msg} · {nav_hint}"), Style::default().fg(Color::Green))
    } else {
        (nav_hint.to_owned(), Style::default())
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, area);
}

fn placeholder(frame: &mut Frame<'_>, area: Rect, title: &str, text: &str) {
    let paragraph = Paragraph::new(text.to_owned())
        .block(Block::default().borders(Borders::ALL).title(title.to_owned()))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn split(direction: Direction, constraints: [Constraint; 2], area: Rect) -> Option<(Rect, Rect)> {
    let chunks = Layout::default()
        .direction(direction)
        .constraints(constraints)
        .split(area);
    match chunks.as_ref() {
        [first, second] => Some((*first, *second)),
        _ => None,
    }
}

fn draw_dashboard(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(data) = app.dashboard.data() else {
        let text = if app.dashboard.is_loading() {
            "Loading dashboard…"
        } else {
            "No data yet. Press r to load."
        };
        placeholder(frame, area, "Dashboard", text);
        return;
    };

    let Some((overview_area, body_area)) = split(
        Direction::Vertical,
        [Constraint::Length(3), Constraint::Min(0)],
        area,
    ) else {
        return;
    };
    let Some((left_area, right_area)) = split(
        Direction::Horizontal,
        [Constraint::Percentage(40), Constraint::Percentage(60)],
        body_area,
    ) else {
        return;
    };
    let Some((alerts_area, active_area)) = split(
        Direction::Vertical,
        [Constraint::Percentage(50), Constraint::Percentage(50)],
        left_area,
    ) else {
        return;
    };
    let Some((routes_area, incidents_area)) = split(
        Direction::Vertical,
        [Constraint::Min(0), Constraint::Length(7)],
        right_area,
    ) else {
        return;
    };

    let overview = data.overview();
    let figures = Line::from(vec![
        Span::raw(format!("Points {} · ", overview.total_points)),
        Span::raw(format!("Active {} · ", overview.active_points)),
        Span::styled(
            format!("Critical {}", overview.alert_points),
            Style::default().fg(Color::Red),
        ),
        Span::raw(format!(" · Avg fill {}% · ", overview.avg_fill_level)),
        Span::raw(format!("Waste {} kg · ", overview.total_waste_kg)),
        Span::styled(
            format!("CO2 saved {} kg", overview.co2_saved_kg),
            Style::default().fg(Color::Green),
        ),
    ]);
    let overview_widget =
        Paragraph::new(figures).block(Block::default().borders(Borders::ALL).title("Overview"));
    frame.render_widget(overview_widget, overview_area);

    let alert_items = if data.alerts.is_empty() {
        vec![ListItem::new("No active alerts.")]
    } else {
        data.alerts
            .iter()
            .map(|alert| {
                let fg = if alert.priority == "HIGH" {
                    Color::Red
                } else {
                    Color::Yellow
                };
                ListItem::new(format!("[{}] {}", alert.priority, alert.message))
                    .style(Style::default().fg(fg))
            })
            .collect()
    };
    let alerts = List::new(alert_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Alerts ({})", data.alerts.len())),
    );
    frame.render_widget(alerts, alerts_area);

    let (active, hidden) = data.visible_active_routes(app.show_all_active);
    let mut active_items: Vec<ListItem<'_>> = active
        .iter()
        .map(|route| {
            ListItem::new(format!(
                "{} · {} stops · {:.1} km",
                route.short_id(),
                route.stops.len(),
                route.estimated_distance_km
            ))
        })
        .collect();
    if active_items.is_empty() {
        active_items.push(ListItem::new("No routes on the road."));
    }
    if hidden > 0 {
        active_items.push(
            ListItem::new(format!("Show {hidden} More (m)"))
                .style(Style::default().add_modifier(Modifier::ITALIC)),
        );
    } else if app.show_all_active && active.len() > ACTIVE_ROUTES_PREVIEW {
        active_items.push(
            ListItem::new("Show Less (m)").style(Style::default().add_modifier(Modifier::ITALIC)),
        );
    }
    let active_list = List::new(active_items)
        .block(Block::default().borders(Borders::ALL).title("Active routes"));
    frame.render_widget(active_list, active_area);

    draw_routes_table(frame, app, data.routes.as_slice(), routes_area);

    let incident_items = if data.incidents.is_empty() {
        vec![ListItem::new("No incidents reported.")]
    } else {
        data.recent_incidents(RECENT_ITEMS)
            .map(|incident| {
                let date = incident
                    .date
                    .map_or_else(|| "N/A".to_owned(), |date| date.format("%d.%m.%Y").to_string());
                ListItem::new(format!("{date}  {:?}  {}", incident.kind, incident.description))
            })
            .collect()
    };
    let incidents = List::new(incident_items)
        .block(Block::default().borders(Borders::ALL).title("Recent incidents"));
    frame.render_widget(incidents, incidents_area);
}

fn draw_routes_table(frame: &mut Frame<'_>, app: &App, routes: &[Route], area: Rect) {
    let rows = routes.iter().map(|route| {
        let badge = route_status_badge(route.status);
        let date = route
            .date
            .map_or_else(|| "N/A".to_owned(), |date| date.format("%d.%m.%Y").to_string());
        let vehicle = route
            .vehicle_id
            .as_ref()
            .map_or_else(|| "N/A".to_owned(), ToString::to_string);

        Row::new(vec![
            Cell::from(route.short_id().to_owned()),
            Cell::from(date),
            Cell::from(badge.label).style(Style::default().fg(color(badge.color))),
            Cell::from(vehicle),
            Cell::from(route.stops.len().to_string()),
            Cell::from(format!("{:.1} km", route.estimated_distance_km)),
        ])
    });

    let column_widths = [
        Constraint::Length(8),
        Constraint::Length(11),
        Constraint::Length(12),
        Constraint::Min(10),
        Constraint::Length(6),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Route", "Date", "Status", "Vehicle", "Stops", "Distance"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Routes ({})", routes.len())),
        )
        .row_highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .column_spacing(1);

    let mut state = TableState::default();
    if !routes.is_empty() {
        state.select(Some(app.route_index));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_map(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let Some((canvas_area, side_area)) = split(
        Direction::Horizontal,
        [Constraint::Min(0), Constraint::Length(34)],
        area,
    ) else {
        return;
    };

    let layers = app.map.layers();
    let drawn = app.path.current();

    let positions = layers
        .markers()
        .map(|marker| marker.position)
        .chain(drawn.iter().flat_map(|path| path.geometry.coordinates.iter().copied()));
    let (x_bounds, y_bounds) = bounds(positions);

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Collection map"))
        .marker(CanvasMarker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            if let Some(path) = &drawn {
                let stroke = color(path.style.color);
                for pair in path.geometry.coordinates.windows(2) {
                    if let [from, to] = pair {
                        ctx.draw(&CanvasLine::new(from.lon, from.lat, to.lon, to.lat, stroke));
                    }
                }
                ctx.layer();
            }
            for marker in layers.markers() {
                ctx.draw(&Points {
                    coords: &[(marker.position.lon, marker.position.lat)],
                    color: color(marker.icon.color),
                });
            }
            for marker in &layers.stop_markers {
                if let Some(label) = &marker.icon.label {
                    ctx.print(
                        marker.position.lon,
                        marker.position.lat,
                        Span::styled(label.clone(), Style::default().fg(color(marker.icon.color))),
                    );
                }
            }
        });
    frame.render_widget(canvas, canvas_area);

    let mut lines = Vec::new();
    match app.map.selected_plan() {
        Some(plan) => {
            let badge = route_status_badge(plan.status);
            lines.push(Line::from(vec![
                Span::raw(format!("Route {} ", plan.route_id)),
                Span::styled(badge.label, Style::default().fg(color(badge.color))),
            ]));
            lines.push(Line::from(format!("{} stops", plan.stops.len())));
        }
        None => lines.push(Line::from("No route selected")),
    }
    lines.push(match app.map.path_note() {
        PathNote::None => Line::from("No path to draw"),
        PathNote::Drawn => {
            let distance = drawn
                .as_ref()
                .map_or(0.0, |path| path.geometry.distance_m / 1_000.0);
            Line::from(format!("Path drawn · {distance:.1} km"))
        }
        PathNote::Unavailable(reason) => Line::styled(
            format!("Routing unavailable: {reason}"),
            Style::default().fg(Color::Red),
        ),
    });
    lines.push(Line::default());
    lines.push(Line::from(format!("Free points   {}", layers.point_markers.len())));
    lines.push(Line::from(format!("Depots        {}", layers.depot_markers.len())));
    lines.push(Line::from(format!("Route stops   {}", layers.stop_markers.len())));
    if !layers.stale.is_empty() {
        lines.push(Line::styled(
            format!("Unplaceable   {}", layers.stale.len()),
            Style::default().fg(Color::Yellow),
        ));
    }

    let side = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Routes"))
        .wrap(Wrap { trim: true });
    frame.render_widget(side, side_area);
}

/// Canvas bounds as `([min_lon, max_lon], [min_lat, max_lat])` with a margin around
/// everything in `positions`.
fn bounds(positions: impl Iterator<Item = GeoPoint>) -> ([f64; 2], [f64; 2]) {
    let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
    for position in positions {
        min_lon = min_lon.min(position.lon);
        max_lon = max_lon.max(position.lon);
        min_lat = min_lat.min(position.lat);
        max_lat = max_lat.max(position.lat);
    }
    if !min_lon.is_finite() || !min_lat.is_finite() {
        (min_lon, max_lon) = (FALLBACK_CENTER.lon, FALLBACK_CENTER.lon);
        (min_lat, max_lat) = (FALLBACK_CENTER.lat, FALLBACK_CENTER.lat);
    }
    let lon_pad = ((max_lon - min_lon) * 0.1).max(0.005);
    let lat_pad = ((max_lat - min_lat) * 0.1).max(0.005);
    (
        [min_lon - lon_pad, max_lon + lon_pad],
        [min_lat - lat_pad, max_lat + lat_pad],
    )
}

fn draw_monitor(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let state = &app.telemetry;
    let updated = state.last_updated.map_or_else(
        || "never".to_owned(),
        |stamp| stamp.with_timezone(&Local).format("%H:%M:%S").to_string(),
    );
    let title = format!("Server supervision · last updated {updated}");

    let Some(snapshot) = &state.snapshot else {
        let text = state
            .error
            .as_deref()
            .unwrap_or("Waiting for the first health sample…");
        placeholder(frame, area, &title, text);
        return;
    };

    let Some((gauge_area, rest)) = split(
        Direction::Vertical,
        [Constraint::Length(3), Constraint::Min(0)],
        area,
    ) else {
        return;
    };

    let pct = memory_usage_pct(snapshot);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(Color::Green))
        .percent(u16::try_from(pct.min(100)).unwrap_or(100))
        .label(format!("Memory used {pct}%"));
    frame.render_widget(gauge, gauge_area);

    let mut lines = vec![
        Line::from(format!("Total used        {}", format_bytes(snapshot.used_memory))),
        Line::from(format!("Free              {}", format_bytes(snapshot.free_memory))),
        Line::from(format!("Max allocatable   {}", format_bytes(snapshot.max_memory))),
        Line::default(),
        Line::from(format!("Load average      {}", format_load(snapshot.system_load))),
        Line::from(format!("Cores             {}", snapshot.available_processors)),
        Line::from(format!("Threads           {}", snapshot.active_threads)),
        Line::default(),
        Line::from(format!("Uptime            {}", format_uptime(snapshot.uptime))),
    ];
    if let Some(err) = &state.error {
        lines.push(Line::default());
        lines.push(Line::styled(
            format!("{err} ({} failed polls, showing last sample)", state.consecutive_failures),
            Style::default().fg(Color::Red),
        ));
    }

    let details = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Memory · CPU · Uptime"));
    frame.render_widget(details, rest);
}

fn draw_statistics(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(data) = app.statistics.data() else {
        let text = if app.statistics.is_loading() {
            "Loading statistics…"
        } else {
            "No data yet. Press r to load."
        };
        placeholder(frame, area, "Statistics", text);
        return;
    };
    let report = data.report();

    let Some((top, bottom)) = split(
        Direction::Vertical,
        [Constraint::Percentage(50), Constraint::Percentage(50)],
        area,
    ) else {
        return;
    };
    let Some((fill_area, fleet_area)) = split(
        Direction::Horizontal,
        [Constraint::Percentage(50), Constraint::Percentage(50)],
        top,
    ) else {
        return;
    };
    let Some((routes_area, workforce_area)) = split(
        Direction::Horizontal,
        [Constraint::Percentage(50), Constraint::Percentage(50)],
        bottom,
    ) else {
        return;
    };

    let fill = report.fill;
    frame.render_widget(
        stat_table(
            format!("Fill levels · average {}%", report.avg_fill_level),
            vec![
                stat_row("Critical (≥ 90%)", fill.critical, Some(fill.critical_pct()), Color::Red),
                stat_row("Warning (50-89%)", fill.warning, Some(fill.warning_pct()), Color::Yellow),
                stat_row("Normal (< 50%)", fill.normal, Some(fill.normal_pct()), Color::Green),
                stat_row("Total points", fill.total, None, Color::Reset),
            ],
        ),
        fill_area,
    );

    let fleet = report.fleet;
    frame.render_widget(
        stat_table(
            format!("Fleet · utilisation {:.1}%", fleet.utilisation_pct()),
            vec![
                stat_row("In use", fleet.in_use, None, Color::Blue),
                stat_row("Available", fleet.available, None, Color::Green),
                stat_row("Maintenance", fleet.maintenance, None, Color::Yellow),
                stat_row("Total vehicles", fleet.total, None, Color::Reset),
            ],
        ),
        fleet_area,
    );

    let routes = report.routes;
    frame.render_widget(
        stat_table(
            format!("Routes · completion {:.1}%", routes.completion_pct()),
            vec![
                stat_row("Completed", routes.completed, None, Color::Gray),
                stat_row("In progress", routes.in_progress, None, Color::Green),
                stat_row("Planned", routes.planned, None, Color::Blue),
                stat_row("Total routes", routes.total, None, Color::Reset),
            ],
        ),
        routes_area,
    );

    let workforce = report.workforce;
    frame.render_widget(
        stat_table(
            "Workforce".to_owned(),
            vec![
                stat_row("Employees", workforce.employees, None, Color::Reset),
                stat_row("Active drivers", workforce.on_duty, None, Color::Green),
            ],
        ),
        workforce_area,
    );
}

fn stat_row(label: &'static str, count: usize, pct: Option<f64>, fg: Color) -> Row<'static> {
    let pct = pct.map(|pct| format!("{pct:.1}%")).unwrap_or_default();
    Row::new(vec![
        Cell::from(label),
        Cell::from(count.to_string()),
        Cell::from(pct),
    ])
    .style(Style::default().fg(fg))
}

fn stat_table(title: String, rows: Vec<Row<'static>>) -> Table<'static> {
    let column_widths = [
        Constraint::Min(18),
        Constraint::Length(8),
        Constraint::Length(8),
    ];
    Table::new(rows, column_widths)
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(1)
}

fn color(marker: MarkerColor) -> Color {
    marker.hex().parse().unwrap_or(Color::White)
}

#[cfg(test)]
mod tests {
    use std::iter;

    use pretty_assertions::assert_eq;
    use ratatui::backend::TestBackend;
    use wastewatch_core::RouteStatus;

    use super::*;
    use crate::app::route;

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).expect("test terminal");
        terminal
            .draw(|frame| draw(frame, app))
            .expect("frame renders");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn empty_bounds_fall_back_to_city_center() {
        let (lon, lat) = bounds(iter::empty());

        assert!(lon[0] < FALLBACK_CENTER.lon && FALLBACK_CENTER.lon < lon[1], "{lon:?}");
        assert!(lat[0] < FALLBACK_CENTER.lat && FALLBACK_CENTER.lat < lat[1], "{lat:?}");
    }

    #[test]
    fn bounds_cover_every_position() {
        let positions = [
            GeoPoint { lat: 36.80, lon: 10.10 },
            GeoPoint { lat: 36.90, lon: 10.30 },
        ];

        let (lon, lat) = bounds(positions.into_iter());

        assert!(lon[0] < 10.10 && lon[1] > 10.30, "{lon:?}");
        assert!(lat[0] < 36.80 && lat[1] > 36.90, "{lat:?}");
    }

    #[test]
    fn marker_palette_maps_to_rgb() {
        assert_eq!(color(MarkerColor::Red), Color::Rgb(0xf5, 0x65, 0x65));
    }

    #[tokio::test]
    async fn dashboard_lists_routes_and_hides_extra_active_ones() {
        let mut active: Vec<_> = (1..=7)
            .map(|idx| {
                let mut route = route(&format!("r{idx}"));
                route.status = RouteStatus::InProgress;
                route
            })
            .collect();
        active.push(route("planned-route"));
        let app = App::offline().with_routes(active);

        let screen = render(&app);

        assert!(screen.contains("Routes (8)"), "{screen}");
        assert!(screen.contains("Show 2 More"), "{screen}");
        assert!(screen.contains("IN PROGRESS"), "{screen}");
    }

    #[tokio::test]
    async fn statistics_without_data_asks_for_reload() {
        let mut app = App::offline();
        app.screen = Screen::Statistics;

        let screen = render(&app);

        assert!(screen.contains("No data yet"), "{screen}");
    }
}
