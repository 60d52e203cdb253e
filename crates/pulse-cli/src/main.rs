//! Aadhaar Pulse - command-line dashboard for the analytics backend.
//!
//! Prints the same panels the dashboard screens show, for one location and
//! simulation date. Panels that fail print an inline message; the process
//! only exits non-zero on usage or configuration errors.

mod args;
mod render;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use futures::future::join_all;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pulse_core::dashboard::Dashboard;
use pulse_core::location::canonical_state_name;
use pulse_core::models::{ForecastRequest, TrendKind, ViewContext};
use pulse_core::{Config, LocationContext};

use args::{Cli, Command};
use render::Renderer;

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr through a non-blocking writer so they never interleave
/// with panel output on stdout. The returned guard must be held until exit.
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=pulse_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });
    config.apply_env();

    let dashboard = Dashboard::from_config(&config)
        .with_context(|| format!("Cannot use API base URL '{}'", config.api_base_url))?;
    info!(base_url = %dashboard.api().base_url(), "Aadhaar Pulse starting");

    let location = dashboard.location_context();
    apply_location(&location, &cli, &config).await;

    let view = ViewContext::new(cli.date.unwrap_or(config.simulation_date), location.filter());

    if cli.state.is_some() {
        config.remember_location(&view.filter);
        if let Err(e) = config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    let stdout = io::stdout();
    let mut renderer = Renderer::new(stdout.lock(), cli.json);
    run(&dashboard, &view, &cli.command, &mut renderer)
        .await
        .context("Failed to write output")?;
    renderer.flush()?;

    Ok(())
}

/// Select the requested (or remembered) location through the context so the
/// state name is canonicalized and its districts are loaded.
async fn apply_location(location: &LocationContext, cli: &Cli, config: &Config) {
    let (state, district) = if cli.state.is_some() {
        (cli.state.clone(), cli.district.clone())
    } else if cli.use_last {
        let last = config.last_location();
        (last.state, last.district)
    } else {
        return;
    };

    location.select_state(state).await;
    if let Some(district) = district {
        let known = location.districts();
        if !known.is_empty() && !known.iter().any(|d| d.eq_ignore_ascii_case(&district)) {
            warn!(
                district = %district,
                state = ?location.selected_state(),
                "District not in the state's district list"
            );
        }
        location.select_district(Some(district));
    }
}

async fn run<W: io::Write>(
    dashboard: &Dashboard,
    view: &ViewContext,
    command: &Command,
    out: &mut Renderer<W>,
) -> io::Result<()> {
    let title = format!("{} | {}", view.label(), view.date);

    match command {
        Command::Health => {
            let (health, ml) = tokio::join!(dashboard.health(), dashboard.ml_status());
            out.health(&health, &ml)
        }
        Command::Kpis => {
            out.heading(&title)?;
            out.kpis(&dashboard.kpis(view).await)
        }
        Command::Summary => {
            out.heading(&title)?;
            out.overview(&dashboard.overview(view).await)
        }
        Command::Trends => {
            out.heading(&title)?;
            let results =
                join_all(TrendKind::ALL.iter().map(|&kind| dashboard.trends(kind, view))).await;
            for (kind, result) in TrendKind::ALL.iter().zip(results) {
                out.trend(&format!("{} trend", kind), &result)?;
            }
            Ok(())
        }
        Command::Anomalies => {
            out.heading(&title)?;
            out.anomalies(&dashboard.anomalies(view).await)
        }
        Command::Heatmap { kind } => {
            out.heading(&format!("{} | {}", view.date, kind))?;
            out.heatmap(&format!("{} heatmap", kind), &dashboard.heatmap(*kind, view).await)
        }
        Command::States => out.names("States", &dashboard.states().await),
        Command::Districts { state } => {
            let state = canonical_state_name(state).unwrap_or_else(|| state.clone());
            out.names(&format!("Districts of {}", state), &dashboard.districts(&state).await)
        }
        Command::Forecast { district, horizon } => {
            out.heading(&format!("{} | from {}", district, view.date))?;
            let mut request = ForecastRequest::new(district.clone(), view.date);
            if let Some(days) = horizon {
                request = request.with_horizon(*days);
            }
            out.forecast(&dashboard.forecast().mutate(request).await)
        }
        Command::Insights => {
            out.heading(&title)?;
            out.insights(&dashboard.insights(view).await)
        }
    }
}
