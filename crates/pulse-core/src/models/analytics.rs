//! Headline analytics: KPIs, per-category summaries and daily trends.
//!
//! Every field defaults when absent so a partial body still renders as
//! zeroes and empty lists.

use serde::{Deserialize, Serialize};

use super::insights::region_name;
use super::lenient;

/// The three update streams the backend tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrendKind {
    Enrollment,
    Demographic,
    Biometric,
}

impl TrendKind {
    pub const ALL: [TrendKind; 3] = [
        TrendKind::Enrollment,
        TrendKind::Demographic,
        TrendKind::Biometric,
    ];

    /// Path segment used by `/api/{kind}/...` and the heatmap endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendKind::Enrollment => "enrollment",
            TrendKind::Demographic => "demographic",
            TrendKind::Biometric => "biometric",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "enrollment" | "enrolment" => Some(TrendKind::Enrollment),
            "demographic" => Some(TrendKind::Demographic),
            "biometric" => Some(TrendKind::Biometric),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct Kpis {
    #[serde(deserialize_with = "lenient::count")]
    pub total_enrollments: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub total_demographic_updates: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub total_biometric_updates: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub states_covered: u32,
    #[serde(deserialize_with = "lenient::count")]
    pub districts_covered: u32,
    #[serde(deserialize_with = "lenient::number")]
    pub enrollment_growth_pct: f64,
}

impl Kpis {
    pub fn total_updates(&self) -> u64 {
        self.total_demographic_updates + self.total_biometric_updates
    }
}

/// A region and its count, as used in top-N breakdowns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(from = "RawRegionCount")]
pub struct RegionCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRegionCount {
    name: Option<String>,
    district: Option<String>,
    state: Option<String>,
    #[serde(alias = "total", deserialize_with = "lenient::count")]
    count: u64,
}

impl From<RawRegionCount> for RegionCount {
    fn from(raw: RawRegionCount) -> Self {
        Self {
            name: region_name([raw.name, raw.district, raw.state]),
            count: raw.count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct EnrollmentSummary {
    #[serde(alias = "total_enrollments", deserialize_with = "lenient::count")]
    pub total: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub age_0_5: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub age_5_17: u64,
    #[serde(alias = "age_18_greater", deserialize_with = "lenient::count")]
    pub age_18_plus: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub districts_covered: u32,
    #[serde(deserialize_with = "lenient::list")]
    pub top_regions: Vec<RegionCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct DemographicSummary {
    #[serde(alias = "total_updates", deserialize_with = "lenient::count")]
    pub total: u64,
    #[serde(alias = "demo_age_5_17", deserialize_with = "lenient::count")]
    pub age_5_17: u64,
    #[serde(alias = "demo_age_17_", deserialize_with = "lenient::count")]
    pub age_17_plus: u64,
    #[serde(deserialize_with = "lenient::list")]
    pub top_regions: Vec<RegionCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct BiometricSummary {
    #[serde(alias = "total_updates", deserialize_with = "lenient::count")]
    pub total: u64,
    #[serde(alias = "bio_age_5_17", deserialize_with = "lenient::count")]
    pub age_5_17: u64,
    #[serde(alias = "bio_age_17_", deserialize_with = "lenient::count")]
    pub age_17_plus: u64,
    #[serde(deserialize_with = "lenient::list")]
    pub top_regions: Vec<RegionCount>,
}

/// One day of a trend series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct TrendPoint {
    #[serde(deserialize_with = "lenient::text")]
    pub date: String,
    #[serde(alias = "count", alias = "total", deserialize_with = "lenient::number")]
    pub value: f64,
}
