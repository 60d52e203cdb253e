//! Backend health and ML subsystem status checks.

use serde::{Deserialize, Serialize};

use super::lenient;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct HealthStatus {
    #[serde(deserialize_with = "lenient::text")]
    pub status: String,
    pub version: Option<String>,
    pub database: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(
            self.status.to_lowercase().as_str(),
            "ok" | "healthy" | "up"
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct MlStatus {
    #[serde(deserialize_with = "lenient::text")]
    pub status: String,
    #[serde(alias = "models", deserialize_with = "lenient::list")]
    pub available_models: Vec<String>,
    pub last_trained: Option<String>,
}
