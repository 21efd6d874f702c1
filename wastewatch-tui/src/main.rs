//! Terminal dashboard for smart waste management: fill levels and alerts, collection routes on a
//! map, backend server health, and fleet statistics.
//!
//! Logs are written to a file (default `/tmp/wastewatch.log`) so they never corrupt the terminal.

mod app;
mod config;
mod input;
mod ui;

use std::{
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration as StdDuration,
};

use anyhow::{Context as _, Result};
use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wastewatch_api::ApiClient;
use wastewatch_core::report::Report;
use wastewatch_core::{RouteStatus, Session, WasteService};
use wastewatch_osrm::OsrmPathPort;

use crate::app::{App, Screen};
use crate::config::{Cli, Settings};
use crate::input::Action;

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;
    let _guard = setup_tracing(&settings);

    // HTTP + service setup
    let service = Arc::new(connect(&settings).await?);
    let routing = OsrmPathPort::new(&settings.routing_url, settings.timeout())?;

    // App state
    let app = App::new(service, Arc::new(routing), settings.poll_interval());

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

/// File-based tracing; stdout belongs to the terminal UI. Hold the guard until exit so
/// buffered lines are flushed.
fn setup_tracing(settings: &Settings) -> WorkerGuard {
    let log_level = match settings.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "wastewatch={log_level},wastewatch_core={log_level},\
             wastewatch_api={log_level},wastewatch_osrm={log_level}"
        ))
    });

    let log_dir = settings
        .log_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let log_filename = settings
        .log_file
        .file_name()
        .unwrap_or(OsStr::new("wastewatch.log"));

    let file_appender = rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

/// Build the service, logging in first when credentials are configured.
async fn connect(settings: &Settings) -> Result<WasteService> {
    let session = settings.token.as_ref().map_or_else(Session::anonymous, |token| {
        Session::with_token(SecretString::from(token.expose_secret().to_owned()))
    });
    let client = ApiClient::new(&settings.api_url, session, settings.timeout())?;

    let Some((username, password)) = settings.credentials() else {
        info!(api = %settings.api_url, "using configured session");
        return Ok(WasteService::new(client.into_backend()));
    };

    let login = WasteService::new(client.clone().into_backend());
    let session = login
        .login(username, password.expose_secret())
        .await
        .with_context(|| format!("login as {username} failed"))?;
    Ok(WasteService::new(client.with_session(session).into_backend()))
}

async fn run(terminal: &mut Tui, mut app: App) -> Result<()> {
    refresh(terminal, &mut app).await?;

    loop {
        app.sync_telemetry();

        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout so health samples show up promptly)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            let action = input::handle_key_event(key, &mut app);

            match action {
                Action::Quit => break,
                Action::None => {}
                Action::Refresh => refresh(terminal, &mut app).await?,
                Action::GenerateRoute => {
                    start_loading(terminal, &mut app)?;
                    let res = app.service.generate_route().await;
                    app.is_loading = false;
                    match res {
                        Ok(route) => {
                            app.notice = Some(format!(
                                "Route {} generated with {} stops",
                                route.short_id(),
                                route.stops.len()
                            ));
                            load_dashboard(terminal, &mut app).await?;
                        }
                        Err(err) => {
                            app.error_message = Some(format!("Failed to generate route: {err}"));
                        }
                    }
                }
                Action::AdvanceRoute => {
                    let Some(route) = app.selected_route().cloned() else {
                        app.error_message = Some("No route selected".into());
                        continue;
                    };
                    if route.status == RouteStatus::Completed {
                        app.notice =
                            Some(format!("Route {} is already completed", route.short_id()));
                        continue;
                    }

                    start_loading(terminal, &mut app)?;
                    let res = app.service.advance_route(&route).await;
                    app.is_loading = false;
                    match res {
                        Ok(updated) => {
                            app.notice = Some(format!(
                                "Route {} is now {}",
                                updated.short_id(),
                                updated.status
                            ));
                            load_dashboard(terminal, &mut app).await?;
                        }
                        Err(err) => {
                            app.error_message = Some(format!("Failed to update route: {err}"));
                        }
                    }
                }
                Action::DeleteRoute => {
                    let Some(id) = app.pending_delete.take() else {
                        continue;
                    };

                    start_loading(terminal, &mut app)?;
                    let res = app.service.delete_route(&id).await;
                    app.is_loading = false;
                    match res {
                        Ok(()) => {
                            app.notice = Some(format!("Route {id} deleted"));
                            load_dashboard(terminal, &mut app).await?;
                        }
                        Err(err) => {
                            app.error_message = Some(format!("Failed to delete route: {err}"));
                        }
                    }
                }
                Action::ExportReport => export_report(&mut app),
                Action::NextMapRoute => {
                    app.map.select_next();
                    start_loading(terminal, &mut app)?;
                    app.map.sync_path().await;
                    app.is_loading = false;
                }
            }
        }
    }

    app.map.teardown();
    Ok(())
}

fn start_loading(terminal: &mut Tui, app: &mut App) -> Result<()> {
    app.is_loading = true;
    app.error_message = None;
    terminal.draw(|frame| ui::draw(frame, app))?;
    Ok(())
}

/// Reload whatever the current screen shows. The server monitor refreshes on its own.
async fn refresh(terminal: &mut Tui, app: &mut App) -> Result<()> {
    match app.screen {
        Screen::Dashboard => load_dashboard(terminal, app).await?,
        Screen::Statistics => {
            let ticket = app.statistics.begin();
            app.error_message = None;
            terminal.draw(|frame| ui::draw(frame, app))?;

            let res = app.service.load_statistics().await;
            app.statistics.settle(ticket, res);
        }
        Screen::Map => {
            start_loading(terminal, app)?;
            let res = app.map.refresh(&app.service).await;
            app.is_loading = false;
            if let Err(err) = res {
                app.error_message = Some(format!("Failed to load map: {err}"));
            }
        }
        Screen::Monitor => {}
    }
    Ok(())
}

async fn load_dashboard(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let ticket = app.dashboard.begin();
    app.error_message = None;
    terminal.draw(|frame| ui::draw(frame, app))?;

    let res = app.service.load_dashboard().await;
    app.dashboard.settle(ticket, res);
    app.clamp_route_index();
    Ok(())
}

fn export_report(app: &mut App) {
    let Some(data) = app.dashboard.data() else {
        app.error_message = Some("Load the dashboard before exporting a report".into());
        return;
    };

    let now = Local::now();
    let path = PathBuf::from(format!("wastewatch-report-{}.txt", now.format("%Y-%m-%d-%H%M%S")));
    let report = Report::new(data, now.naive_local()).to_string();

    match fs::write(&path, report) {
        Ok(()) => {
            info!(path = %path.display(), "report exported");
            app.notice = Some(format!("Report saved to {}", path.display()));
        }
        Err(err) => {
            warn!(error = %err, path = %path.display(), "report export failed");
            app.error_message = Some(format!("Failed to write report: {err}"));
        }
    }
}
