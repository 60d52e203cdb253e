//! Text and JSON rendering of dashboard panels.
//!
//! A failed panel prints a one-line message in place of its content; the
//! other panels still render.

use std::io::{self, Write};

use pulse_core::dashboard::{Insights, Overview, PanelResult};
use pulse_core::estimates::mbu_breakdown;
use pulse_core::models::{
    Anomaly, CapacityPlan, ForecastResponse, FraudSignal, HealthStatus, HeatmapPoint, Hotspot,
    Kpis, MbuProjection, MlStatus, RankingEntry, RegionCount, TrendPoint, UnderservedArea,
};
use pulse_core::utils::{
    format_compact, format_count, format_date, format_signed_percent, truncate_string,
};
use serde::Serialize;

/// Rows shown per list panel in text mode.
const MAX_ROWS: usize = 10;

const NAME_WIDTH: usize = 24;

pub struct Renderer<W: Write> {
    out: W,
    json: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn heading(&mut self, text: &str) -> io::Result<()> {
        if self.json {
            return Ok(());
        }
        writeln!(self.out, "== {} ==", text)
    }

    /// Render one panel: its content on success, an inline error otherwise.
    pub fn panel<T, F>(&mut self, title: &str, result: &PanelResult<T>, body: F) -> io::Result<()>
    where
        T: Serialize,
        F: FnOnce(&mut W, &T) -> io::Result<()>,
    {
        if self.json {
            let line = match result {
                Ok(data) => match serde_json::to_value(&**data) {
                    Ok(value) => serde_json::json!({ "panel": title, "data": value }),
                    Err(e) => serde_json::json!({ "panel": title, "error": e.to_string() }),
                },
                Err(e) => serde_json::json!({ "panel": title, "error": e.to_string() }),
            };
            return writeln!(self.out, "{}", line);
        }

        writeln!(self.out, "[{}]", title)?;
        match result {
            Ok(data) => body(&mut self.out, data),
            Err(e) => writeln!(self.out, "  unavailable: {}", e),
        }
    }

    pub fn overview(&mut self, overview: &Overview) -> io::Result<()> {
        self.panel("KPIs", &overview.kpis, write_kpis)?;
        self.panel("Enrollment", &overview.enrollment, |out, s| {
            writeln!(
                out,
                "  total {}  0-5 {}  5-17 {}  18+ {}",
                format_count(s.total),
                format_count(s.age_0_5),
                format_count(s.age_5_17),
                format_count(s.age_18_plus)
            )?;
            write_regions(out, &s.top_regions)
        })?;
        self.panel("Demographic updates", &overview.demographic, |out, s| {
            writeln!(
                out,
                "  total {}  5-17 {}  17+ {}",
                format_count(s.total),
                format_count(s.age_5_17),
                format_count(s.age_17_plus)
            )?;
            write_regions(out, &s.top_regions)
        })?;
        self.panel("Biometric updates", &overview.biometric, |out, s| {
            writeln!(
                out,
                "  total {}  5-17 {}  17+ {}",
                format_count(s.total),
                format_count(s.age_5_17),
                format_count(s.age_17_plus)
            )?;
            write_regions(out, &s.top_regions)
        })?;
        self.trend("Enrollment trend", &overview.enrollment_trend)?;
        self.trend("Demographic trend", &overview.demographic_trend)?;
        self.trend("Biometric trend", &overview.biometric_trend)
    }

    pub fn trend(&mut self, title: &str, result: &PanelResult<Vec<TrendPoint>>) -> io::Result<()> {
        self.panel(title, result, |out, v| write_trend(out, v))
    }

    pub fn kpis(&mut self, result: &PanelResult<Kpis>) -> io::Result<()> {
        self.panel("KPIs", result, write_kpis)
    }

    pub fn health(
        &mut self,
        health: &PanelResult<HealthStatus>,
        ml: &PanelResult<MlStatus>,
    ) -> io::Result<()> {
        self.panel("Backend", health, |out, h| {
            let state = if h.is_healthy() { "healthy" } else { "degraded" };
            writeln!(out, "  {} ({})", state, h.status)?;
            if let Some(version) = &h.version {
                writeln!(out, "  version {}", version)?;
            }
            Ok(())
        })?;
        self.panel("ML models", ml, |out, m| {
            writeln!(out, "  {}", m.status)?;
            if !m.available_models.is_empty() {
                writeln!(out, "  models: {}", m.available_models.join(", "))?;
            }
            if let Some(trained) = &m.last_trained {
                writeln!(out, "  last trained {}", format_date(trained))?;
            }
            Ok(())
        })
    }

    pub fn anomalies(&mut self, result: &PanelResult<Vec<Anomaly>>) -> io::Result<()> {
        self.panel("Anomalies", result, |out, list| {
            if list.is_empty() {
                return writeln!(out, "  none detected");
            }
            let mut sorted: Vec<&Anomaly> = list.iter().collect();
            sorted.sort_by(|a, b| b.severity_level().cmp(&a.severity_level()));
            for a in sorted.into_iter().take(MAX_ROWS) {
                let place = match &a.district {
                    Some(d) => format!("{}, {}", d, a.state),
                    None => a.state.clone(),
                };
                writeln!(
                    out,
                    "  {:<8} {} {:<w$} {} ({})",
                    a.severity,
                    format_date(&a.date),
                    truncate_string(&place, NAME_WIDTH),
                    a.metric,
                    format_signed_percent(a.deviation_pct()),
                    w = NAME_WIDTH
                )?;
            }
            Ok(())
        })
    }

    pub fn heatmap(
        &mut self,
        title: &str,
        result: &PanelResult<Vec<HeatmapPoint>>,
    ) -> io::Result<()> {
        self.panel(title, result, |out, points| {
            writeln!(out, "  {} locations", points.len())?;
            let mut sorted: Vec<&HeatmapPoint> = points.iter().collect();
            sorted.sort_by(|a, b| b.value.total_cmp(&a.value));
            for p in sorted.into_iter().take(MAX_ROWS) {
                let name = p.district.as_deref().unwrap_or(&p.state);
                writeln!(
                    out,
                    "  {:<w$} {:>12} ({:.3}, {:.3})",
                    truncate_string(name, NAME_WIDTH),
                    format_compact(p.value),
                    p.latitude,
                    p.longitude,
                    w = NAME_WIDTH
                )?;
            }
            Ok(())
        })
    }

    pub fn names(&mut self, title: &str, result: &PanelResult<Vec<String>>) -> io::Result<()> {
        self.panel(title, result, |out, names| {
            if names.is_empty() {
                return writeln!(out, "  (none)");
            }
            for name in names {
                writeln!(out, "  {}", name)?;
            }
            Ok(())
        })
    }

    pub fn forecast(&mut self, result: &PanelResult<ForecastResponse>) -> io::Result<()> {
        self.panel("MBU forecast", result, |out, f| {
            writeln!(
                out,
                "  {} days, total {}",
                f.forecast.len(),
                format_compact(f.total_predicted())
            )?;
            if let Some(peak) = f.peak() {
                writeln!(
                    out,
                    "  peak {} on {}",
                    format_compact(peak.predicted),
                    format_date(&peak.date)
                )?;
            }
            if let Some(model) = &f.model {
                writeln!(out, "  model {}", model)?;
            }
            Ok(())
        })
    }

    pub fn insights(&mut self, insights: &Insights) -> io::Result<()> {
        self.panel("Capacity", &insights.capacity, |out, v| write_capacity(out, v))?;
        self.panel("Underserved areas", &insights.underserved, |out, v| {
            write_underserved(out, v)
        })?;
        self.panel("Fraud signals", &insights.fraud, |out, v| write_fraud(out, v))?;
        self.panel("Hotspots", &insights.hotspots, |out, v| write_hotspots(out, v))?;
        self.panel("MBU projection", &insights.mbu_projection, |out, v| write_mbu(out, v))?;
        self.panel("Rankings", &insights.rankings, |out, v| write_rankings(out, v))
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

fn write_kpis<W: Write>(out: &mut W, k: &Kpis) -> io::Result<()> {
    writeln!(out, "  enrollments      {}", format_count(k.total_enrollments))?;
    writeln!(out, "  demographic upd. {}", format_count(k.total_demographic_updates))?;
    writeln!(out, "  biometric upd.   {}", format_count(k.total_biometric_updates))?;
    writeln!(
        out,
        "  coverage         {} states, {} districts",
        k.states_covered, k.districts_covered
    )?;
    writeln!(out, "  growth           {}", format_signed_percent(k.enrollment_growth_pct))
}

fn write_regions<W: Write>(out: &mut W, regions: &[RegionCount]) -> io::Result<()> {
    for r in regions.iter().take(5) {
        writeln!(
            out,
            "    {:<w$} {}",
            truncate_string(&r.name, NAME_WIDTH),
            format_count(r.count),
            w = NAME_WIDTH
        )?;
    }
    Ok(())
}

fn write_trend<W: Write>(out: &mut W, points: &[TrendPoint]) -> io::Result<()> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return writeln!(out, "  no data");
    };
    let total: f64 = points.iter().map(|p| p.value).sum();
    writeln!(
        out,
        "  {} days {} .. {}, total {}, latest {}",
        points.len(),
        format_date(&first.date),
        format_date(&last.date),
        format_compact(total),
        format_compact(last.value)
    )
}

fn write_capacity<W: Write>(out: &mut W, plans: &[CapacityPlan]) -> io::Result<()> {
    for p in plans.iter().take(MAX_ROWS) {
        writeln!(
            out,
            "  {:<w$} demand {:>8} operators {:>5.0} util {:>5.1}% wait {:.0}m",
            truncate_string(&p.district, NAME_WIDTH),
            format_compact(p.daily_demand),
            p.required_operators,
            p.utilization * 100.0,
            p.expected_wait_minutes,
            w = NAME_WIDTH
        )?;
    }
    Ok(())
}

fn write_underserved<W: Write>(out: &mut W, areas: &[UnderservedArea]) -> io::Result<()> {
    for a in areas.iter().take(MAX_ROWS) {
        writeln!(
            out,
            "  {:<w$} score {:.2} coverage {:.1}%",
            truncate_string(&a.district, NAME_WIDTH),
            a.underserved_score,
            a.coverage_ratio * 100.0,
            w = NAME_WIDTH
        )?;
    }
    Ok(())
}

fn write_fraud<W: Write>(out: &mut W, signals: &[FraudSignal]) -> io::Result<()> {
    for s in signals.iter().take(MAX_ROWS) {
        let marker = if s.is_high_risk() { "!" } else { " " };
        writeln!(
            out,
            " {}{:<w$} risk {:.2} entropy {:.2} {}",
            marker,
            truncate_string(&s.district, NAME_WIDTH),
            s.risk_score,
            s.digit_entropy,
            s.flags.join(","),
            w = NAME_WIDTH
        )?;
    }
    Ok(())
}

fn write_hotspots<W: Write>(out: &mut W, hotspots: &[Hotspot]) -> io::Result<()> {
    for h in hotspots.iter().take(MAX_ROWS) {
        writeln!(
            out,
            "  {:<w$} {} ewma {:.2} z {:.2}",
            truncate_string(&h.district, NAME_WIDTH),
            h.metric,
            h.ewma_score,
            h.z_score,
            w = NAME_WIDTH
        )?;
    }
    Ok(())
}

fn write_mbu<W: Write>(out: &mut W, projections: &[MbuProjection]) -> io::Result<()> {
    for p in projections.iter().take(MAX_ROWS) {
        let breakdown = mbu_breakdown(p);
        let split: Vec<String> = breakdown
            .cohorts
            .iter()
            .map(|c| {
                format!(
                    "{} {} ({:.0}%)",
                    c.cohort.label(),
                    format_compact(c.count),
                    c.share_percent
                )
            })
            .collect();
        let note = if breakdown.estimated { " [estimate]" } else { "" };
        writeln!(
            out,
            "  {:<w$} due {}: {}{}",
            truncate_string(&p.district, NAME_WIDTH),
            format_compact(breakdown.total),
            split.join(", "),
            note,
            w = NAME_WIDTH
        )?;
    }
    Ok(())
}

fn write_rankings<W: Write>(out: &mut W, rankings: &[RankingEntry]) -> io::Result<()> {
    for r in rankings.iter().take(MAX_ROWS) {
        writeln!(
            out,
            "  {:>3}. {:<w$} {}",
            r.rank,
            truncate_string(&r.name, NAME_WIDTH),
            format_compact(r.value),
            w = NAME_WIDTH
        )?;
    }
    Ok(())
}
