//! Command-line schema.

use clap::{Parser, Subcommand};
use pulse_core::models::{SimulationDate, TrendKind};

/// Aadhaar Pulse analytics dashboard
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "pulse", version, about, propagate_version = true)]
pub struct Cli {
    /// Simulation date
    #[arg(long, value_name = "yyyy-MM-dd")]
    pub date: Option<SimulationDate>,

    /// Filter by state
    #[arg(long)]
    pub state: Option<String>,

    /// Filter by district
    #[arg(long, requires = "state")]
    pub district: Option<String>,

    /// Reuse the last remembered location
    #[arg(long = "last", conflicts_with = "state")]
    pub use_last: bool,

    /// Print JSON lines instead of text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Backend and ML model status
    Health,

    /// Headline KPIs
    Kpis,

    /// KPIs, category summaries and trends
    Summary,

    /// Daily trends for every update stream
    Trends,

    /// Detected anomalies
    Anomalies,

    /// Heatmap points for one update stream
    Heatmap {
        /// enrollment, demographic or biometric
        #[arg(value_parser = parse_trend_kind)]
        kind: TrendKind,
    },

    /// Known states
    States,

    /// Districts of a state
    Districts { state: String },

    /// Generate an MBU forecast for a district
    Forecast {
        district: String,

        /// Horizon in days (default 30)
        #[arg(value_name = "DAYS")]
        horizon: Option<u32>,
    },

    /// ML insights (capacity, fraud, hotspots, ...)
    Insights,
}

fn parse_trend_kind(s: &str) -> Result<TrendKind, String> {
    TrendKind::parse(s).ok_or_else(|| format!("unknown update stream '{}'", s))
}
