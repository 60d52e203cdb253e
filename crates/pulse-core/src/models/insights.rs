//! ML insight records served under `/api/ml-v2/*`.
//!
//! The backend has renamed several fields over time and still emits either
//! spelling. Each record deserializes through a private `Raw*` form and is
//! normalized in exactly one `From` impl, resolving `new -> legacy -> 0`.

use serde::{Deserialize, Serialize};

use super::lenient;

/// Resolve a renamed numeric field: new name first, then legacy, then zero.
fn resolve(new: Option<f64>, legacy: Option<f64>) -> f64 {
    new.or(legacy).unwrap_or(0.0)
}

/// Pick the most specific region name a row carries.
pub(crate) fn region_name(candidates: [Option<String>; 3]) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|name| !name.trim().is_empty())
        .unwrap_or_default()
}

// ============================================================================
// Capacity
// ============================================================================

/// Staffing estimate for one district (queueing-model output).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(from = "RawCapacityPlan")]
pub struct CapacityPlan {
    pub state: String,
    pub district: String,
    pub daily_demand: f64,
    pub required_operators: f64,
    pub utilization: f64,
    pub expected_wait_minutes: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCapacityPlan {
    #[serde(deserialize_with = "lenient::text")]
    state: String,
    #[serde(deserialize_with = "lenient::text")]
    district: String,
    #[serde(deserialize_with = "lenient::optional_number")]
    daily_demand: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    avg_daily_load: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    required_operators: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    operators_needed: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    utilization: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    utilisation: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    expected_wait_minutes: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    avg_wait: Option<f64>,
}

impl From<RawCapacityPlan> for CapacityPlan {
    fn from(raw: RawCapacityPlan) -> Self {
        Self {
            state: raw.state,
            district: raw.district,
            daily_demand: resolve(raw.daily_demand, raw.avg_daily_load),
            required_operators: resolve(raw.required_operators, raw.operators_needed),
            utilization: resolve(raw.utilization, raw.utilisation),
            expected_wait_minutes: resolve(raw.expected_wait_minutes, raw.avg_wait),
        }
    }
}

// ============================================================================
// Underserved areas
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(from = "RawUnderservedArea")]
pub struct UnderservedArea {
    pub state: String,
    pub district: String,
    pub underserved_score: f64,
    pub coverage_ratio: f64,
    pub population: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUnderservedArea {
    #[serde(deserialize_with = "lenient::text")]
    state: String,
    #[serde(deserialize_with = "lenient::text")]
    district: String,
    #[serde(deserialize_with = "lenient::optional_number")]
    underserved_score: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    score: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    coverage_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    coverage: Option<f64>,
    #[serde(deserialize_with = "lenient::count")]
    population: u64,
}

impl From<RawUnderservedArea> for UnderservedArea {
    fn from(raw: RawUnderservedArea) -> Self {
        Self {
            state: raw.state,
            district: raw.district,
            underserved_score: resolve(raw.underserved_score, raw.score),
            coverage_ratio: resolve(raw.coverage_ratio, raw.coverage),
            population: raw.population,
        }
    }
}

// ============================================================================
// Fraud
// ============================================================================

/// Digit-distribution risk signal for a district.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(from = "RawFraudSignal")]
pub struct FraudSignal {
    pub state: String,
    pub district: String,
    pub risk_score: f64,
    pub digit_entropy: f64,
    pub flags: Vec<String>,
}

impl FraudSignal {
    /// Backend risk scores are 0..1; anything at or above this is flagged red.
    pub const HIGH_RISK: f64 = 0.7;

    pub fn is_high_risk(&self) -> bool {
        self.risk_score >= Self::HIGH_RISK
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFraudSignal {
    #[serde(deserialize_with = "lenient::text")]
    state: String,
    #[serde(deserialize_with = "lenient::text")]
    district: String,
    #[serde(deserialize_with = "lenient::optional_number")]
    risk_score: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    fraud_score: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    digit_entropy: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    entropy: Option<f64>,
    #[serde(alias = "reasons", deserialize_with = "lenient::list")]
    flags: Vec<String>,
}

impl From<RawFraudSignal> for FraudSignal {
    fn from(raw: RawFraudSignal) -> Self {
        Self {
            state: raw.state,
            district: raw.district,
            risk_score: resolve(raw.risk_score, raw.fraud_score),
            digit_entropy: resolve(raw.digit_entropy, raw.entropy),
            flags: raw.flags,
        }
    }
}

// ============================================================================
// Clustering
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(from = "RawClusterAssignment")]
pub struct ClusterAssignment {
    pub name: String,
    pub cluster_id: i64,
    pub label: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawClusterAssignment {
    #[serde(alias = "region")]
    name: Option<String>,
    district: Option<String>,
    state: Option<String>,
    #[serde(deserialize_with = "lenient::optional_number")]
    cluster_id: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    cluster: Option<f64>,
    #[serde(alias = "cluster_label", deserialize_with = "lenient::text")]
    label: String,
}

impl From<RawClusterAssignment> for ClusterAssignment {
    fn from(raw: RawClusterAssignment) -> Self {
        Self {
            name: region_name([raw.name, raw.district, raw.state]),
            cluster_id: raw.cluster_id.or(raw.cluster).map_or(0, |id| id.round() as i64),
            label: raw.label,
        }
    }
}

// ============================================================================
// Hotspots
// ============================================================================

/// EWMA-detected surge for a district on a given day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(from = "RawHotspot")]
pub struct Hotspot {
    pub state: String,
    pub district: String,
    pub date: String,
    pub metric: String,
    pub ewma_score: f64,
    pub z_score: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHotspot {
    #[serde(deserialize_with = "lenient::text")]
    state: String,
    #[serde(deserialize_with = "lenient::text")]
    district: String,
    #[serde(deserialize_with = "lenient::text")]
    date: String,
    #[serde(deserialize_with = "lenient::text")]
    metric: String,
    #[serde(deserialize_with = "lenient::optional_number")]
    ewma_score: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    ewma: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    z_score: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    deviation: Option<f64>,
}

impl From<RawHotspot> for Hotspot {
    fn from(raw: RawHotspot) -> Self {
        Self {
            state: raw.state,
            district: raw.district,
            date: raw.date,
            metric: raw.metric,
            ewma_score: resolve(raw.ewma_score, raw.ewma),
            z_score: resolve(raw.z_score, raw.deviation),
        }
    }
}

// ============================================================================
// MBU projection
// ============================================================================

/// Mandatory biometric update cohorts falling due in a district.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(from = "RawMbuProjection")]
pub struct MbuProjection {
    pub state: String,
    pub district: String,
    pub due_age_5: f64,
    pub due_age_15: f64,
    pub total_due: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMbuProjection {
    #[serde(deserialize_with = "lenient::text")]
    state: String,
    #[serde(deserialize_with = "lenient::text")]
    district: String,
    #[serde(deserialize_with = "lenient::optional_number")]
    mbu_due_age_5: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    age_5_due: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    mbu_due_age_15: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    age_15_due: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    total_due: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    total: Option<f64>,
}

impl From<RawMbuProjection> for MbuProjection {
    fn from(raw: RawMbuProjection) -> Self {
        Self {
            state: raw.state,
            district: raw.district,
            due_age_5: resolve(raw.mbu_due_age_5, raw.age_5_due),
            due_age_15: resolve(raw.mbu_due_age_15, raw.age_15_due),
            total_due: resolve(raw.total_due, raw.total),
        }
    }
}

// ============================================================================
// Rankings and comparisons
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(from = "RawRankingEntry")]
pub struct RankingEntry {
    pub rank: u32,
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRankingEntry {
    #[serde(deserialize_with = "lenient::count")]
    rank: u32,
    name: Option<String>,
    district: Option<String>,
    state: Option<String>,
    #[serde(deserialize_with = "lenient::optional_number")]
    value: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    score: Option<f64>,
}

impl From<RawRankingEntry> for RankingEntry {
    fn from(raw: RawRankingEntry) -> Self {
        Self {
            rank: raw.rank,
            name: region_name([raw.name, raw.district, raw.state]),
            value: resolve(raw.value, raw.score),
        }
    }
}

/// One region's value next to the national average for the same metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(from = "RawComparedRegion")]
pub struct ComparedRegion {
    pub name: String,
    pub value: f64,
    pub national_average: f64,
}

impl ComparedRegion {
    /// Percent above (positive) or below the national average.
    pub fn vs_national_pct(&self) -> f64 {
        if self.national_average == 0.0 {
            0.0
        } else {
            (self.value - self.national_average) / self.national_average * 100.0
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawComparedRegion {
    name: Option<String>,
    district: Option<String>,
    state: Option<String>,
    #[serde(deserialize_with = "lenient::optional_number")]
    value: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    count: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    national_avg: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    average: Option<f64>,
}

impl From<RawComparedRegion> for ComparedRegion {
    fn from(raw: RawComparedRegion) -> Self {
        Self {
            name: region_name([raw.name, raw.district, raw.state]),
            value: resolve(raw.value, raw.count),
            national_average: resolve(raw.national_avg, raw.average),
        }
    }
}

/// Month-over-year comparison row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(from = "RawMonthlyComparison")]
pub struct MonthlyComparison {
    pub month: String,
    pub current: f64,
    pub previous: f64,
    pub change_pct: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMonthlyComparison {
    #[serde(deserialize_with = "lenient::text")]
    month: String,
    #[serde(deserialize_with = "lenient::optional_number")]
    current: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    this_year: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    previous: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    last_year: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    change_pct: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    growth: Option<f64>,
}

impl From<RawMonthlyComparison> for MonthlyComparison {
    fn from(raw: RawMonthlyComparison) -> Self {
        Self {
            month: raw.month,
            current: resolve(raw.current, raw.this_year),
            previous: resolve(raw.previous, raw.last_year),
            change_pct: resolve(raw.change_pct, raw.growth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_precedence() {
        assert_eq!(resolve(Some(1.0), Some(2.0)), 1.0);
        assert_eq!(resolve(None, Some(2.0)), 2.0);
        assert_eq!(resolve(None, None), 0.0);
    }

    #[test]
    fn test_capacity_prefers_new_fields() {
        let json = r#"{"district": "Patna", "required_operators": 12, "operators_needed": 9,
            "utilisation": 0.8}"#;
        let plan: CapacityPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.required_operators, 12.0);
        assert_eq!(plan.utilization, 0.8);
        assert_eq!(plan.daily_demand, 0.0);
    }

    #[test]
    fn test_fraud_legacy_fields() {
        let json = r#"{"district": "Gaya", "fraud_score": 0.91, "entropy": 2.1, "reasons": ["round numbers"]}"#;
        let signal: FraudSignal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.risk_score, 0.91);
        assert_eq!(signal.digit_entropy, 2.1);
        assert_eq!(signal.flags, vec!["round numbers"]);
        assert!(signal.is_high_risk());
    }

    #[test]
    fn test_hotspot_and_mbu_legacy_fields() {
        let hotspot: Hotspot =
            serde_json::from_str(r#"{"district": "Thane", "ewma": 3.5, "deviation": 2.2}"#).unwrap();
        assert_eq!(hotspot.ewma_score, 3.5);
        assert_eq!(hotspot.z_score, 2.2);

        let mbu: MbuProjection =
            serde_json::from_str(r#"{"age_5_due": 100, "mbu_due_age_15": 40, "total": 140}"#).unwrap();
        assert_eq!(mbu.due_age_5, 100.0);
        assert_eq!(mbu.due_age_15, 40.0);
        assert_eq!(mbu.total_due, 140.0);
    }

    #[test]
    fn test_cluster_and_ranking_fallbacks() {
        let cluster: ClusterAssignment =
            serde_json::from_str(r#"{"region": "Assam", "cluster": 3}"#).unwrap();
        assert_eq!(cluster.name, "Assam");
        assert_eq!(cluster.cluster_id, 3);

        let entry: RankingEntry =
            serde_json::from_str(r#"{"rank": 1, "state": "Kerala", "score": 98.5}"#).unwrap();
        assert_eq!(entry.name, "Kerala");
        assert_eq!(entry.value, 98.5);

        let entry: RankingEntry =
            serde_json::from_str(r#"{"rank": 2, "state": "Kerala", "district": "Idukki", "value": 7}"#)
                .unwrap();
        assert_eq!(entry.name, "Idukki");
    }

    #[test]
    fn test_compare_and_monthly() {
        let region: ComparedRegion =
            serde_json::from_str(r#"{"name": "Goa", "count": 120, "average": 100}"#).unwrap();
        assert_eq!(region.vs_national_pct(), 20.0);

        let month: MonthlyComparison =
            serde_json::from_str(r#"{"month": "2025-11", "this_year": 10, "last_year": 8, "growth": 25}"#)
                .unwrap();
        assert_eq!(month.current, 10.0);
        assert_eq!(month.previous, 8.0);
        assert_eq!(month.change_pct, 25.0);
    }

    #[test]
    fn test_null_region_keeps_row_in_list() {
        let body = serde_json::json!({"districts": [
            {"state": null, "district": "Patna", "required_operators": 6},
            {"state": "Bihar", "district": "Gaya", "operators_needed": "4"}
        ]});
        let plans: Vec<CapacityPlan> = crate::api::unwrap_list(body, "districts");
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].state, "");
        assert_eq!(plans[0].district, "Patna");
        assert_eq!(plans[1].required_operators, 4.0);
    }

    #[test]
    fn test_float_and_null_whole_numbers() {
        let area: UnderservedArea =
            serde_json::from_str(r#"{"district": "Nuh", "population": 250000.0, "score": null}"#).unwrap();
        assert_eq!(area.population, 250_000);
        assert_eq!(area.underserved_score, 0.0);

        let entry: RankingEntry =
            serde_json::from_str(r#"{"rank": 3.0, "state": "Goa", "value": null}"#).unwrap();
        assert_eq!(entry.rank, 3);
        assert_eq!(entry.value, 0.0);

        let cluster: ClusterAssignment =
            serde_json::from_str(r#"{"state": "Assam", "cluster_id": 2.0, "label": null}"#).unwrap();
        assert_eq!(cluster.cluster_id, 2);
        assert_eq!(cluster.label, "");

        let signal: FraudSignal =
            serde_json::from_str(r#"{"district": null, "risk_score": 0.2, "flags": null}"#).unwrap();
        assert!(signal.flags.is_empty());
        assert!(!signal.is_high_risk());
    }

    #[test]
    fn test_normalized_form_serializes_clean() {
        let plan: CapacityPlan = serde_json::from_str(r#"{"operators_needed": 4}"#).unwrap();
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["required_operators"], 4.0);
        assert!(value.get("operators_needed").is_none());
    }
}
