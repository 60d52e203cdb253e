//! Geospatial heatmap points and detected anomalies.

use serde::{Deserialize, Serialize};

use super::lenient;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct HeatmapPoint {
    #[serde(deserialize_with = "lenient::text")]
    pub state: String,
    pub district: Option<String>,
    #[serde(alias = "lat", deserialize_with = "lenient::number")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon", deserialize_with = "lenient::number")]
    pub longitude: f64,
    #[serde(alias = "count", alias = "intensity", deserialize_with = "lenient::number")]
    pub value: f64,
}

/// Severity bucket attached to an anomaly by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" | "moderate" => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct Anomaly {
    #[serde(deserialize_with = "lenient::text")]
    pub date: String,
    #[serde(deserialize_with = "lenient::text")]
    pub state: String,
    pub district: Option<String>,
    #[serde(alias = "type", deserialize_with = "lenient::text")]
    pub metric: String,
    #[serde(alias = "actual", deserialize_with = "lenient::number")]
    pub value: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub expected: f64,
    #[serde(alias = "zscore", deserialize_with = "lenient::number")]
    pub z_score: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub severity: String,
}

impl Anomaly {
    pub fn severity_level(&self) -> Severity {
        Severity::parse(&self.severity)
    }

    /// Relative deviation from the expected value, 0 when nothing was expected.
    pub fn deviation_pct(&self) -> f64 {
        if self.expected == 0.0 {
            0.0
        } else {
            (self.value - self.expected) / self.expected * 100.0
        }
    }
}
