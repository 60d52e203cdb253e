//! Forecast requests and responses.

use serde::{Deserialize, Serialize};

use super::{lenient, SimulationDate};

/// Horizon used when the caller does not pick one.
pub const DEFAULT_HORIZON_DAYS: u32 = 30;

/// POST body shared by the single and comprehensive forecast endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub district: String,
    pub forecast_from: SimulationDate,
    pub horizon_days: u32,
}

impl ForecastRequest {
    pub fn new(district: impl Into<String>, forecast_from: SimulationDate) -> Self {
        Self {
            district: district.into(),
            forecast_from,
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }

    pub fn with_horizon(mut self, horizon_days: u32) -> Self {
        self.horizon_days = horizon_days;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct ForecastPoint {
    #[serde(deserialize_with = "lenient::text")]
    pub date: String,
    #[serde(alias = "yhat", alias = "value", deserialize_with = "lenient::number")]
    pub predicted: f64,
    #[serde(alias = "yhat_lower", deserialize_with = "lenient::optional_number")]
    pub lower: Option<f64>,
    #[serde(alias = "yhat_upper", deserialize_with = "lenient::optional_number")]
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct ForecastResponse {
    #[serde(deserialize_with = "lenient::text")]
    pub district: String,
    #[serde(alias = "predictions", deserialize_with = "lenient::list")]
    pub forecast: Vec<ForecastPoint>,
    pub model: Option<String>,
    #[serde(deserialize_with = "lenient::optional_number")]
    pub mape: Option<f64>,
}

impl ForecastResponse {
    pub fn total_predicted(&self) -> f64 {
        self.forecast.iter().map(|p| p.predicted).sum()
    }

    pub fn peak(&self) -> Option<&ForecastPoint> {
        self.forecast
            .iter()
            .max_by(|a, b| a.predicted.total_cmp(&b.predicted))
    }
}

/// Per-stream forecasts for one district.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct ComprehensiveForecast {
    #[serde(deserialize_with = "lenient::text")]
    pub district: String,
    #[serde(deserialize_with = "lenient::list")]
    pub enrollment: Vec<ForecastPoint>,
    #[serde(deserialize_with = "lenient::list")]
    pub demographic: Vec<ForecastPoint>,
    #[serde(deserialize_with = "lenient::list")]
    pub biometric: Vec<ForecastPoint>,
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let date = SimulationDate::from_ymd(2025, 12, 15).unwrap();
        let request = ForecastRequest::new("Pune", date).with_horizon(14);
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"district": "Pune", "forecast_from": "2025-12-15", "horizon_days": 14})
        );
    }

    #[test]
    fn test_response_totals() {
        let json = r#"{"district": "Pune", "predictions": [
            {"date": "2025-12-16", "yhat": 10.0},
            {"date": "2025-12-17", "yhat": 25.5, "yhat_lower": 20.0, "yhat_upper": 31.0}
        ]}"#;
        let response: ForecastResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.total_predicted(), 35.5);
        assert_eq!(response.peak().map(|p| p.date.as_str()), Some("2025-12-17"));
        assert!(ForecastResponse::default().peak().is_none());
    }

    #[test]
    fn test_response_tolerates_nulls() {
        let json = r#"{"district": null, "predictions": [
            {"date": "2025-12-16", "yhat": null, "yhat_lower": null},
            {"date": "2025-12-17", "yhat": 12}
        ], "mape": null}"#;
        let response: ForecastResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.forecast.len(), 2);
        assert_eq!(response.forecast[0].predicted, 0.0);
        assert!(response.forecast[0].lower.is_none());
        assert_eq!(response.total_predicted(), 12.0);

        let comprehensive: ComprehensiveForecast =
            serde_json::from_str(r#"{"district": "Pune", "enrollment": null}"#).unwrap();
        assert!(comprehensive.enrollment.is_empty());
    }
}
