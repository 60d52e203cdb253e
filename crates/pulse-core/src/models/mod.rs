//! Data models for Aadhaar Pulse resources.
//!
//! - `LocationFilter`, `SimulationDate`, `ViewContext`: request scoping
//! - `Kpis`, `EnrollmentSummary`, `DemographicSummary`, `BiometricSummary`,
//!   `TrendPoint`: headline analytics
//! - `HeatmapPoint`, `Anomaly`: geospatial and anomaly views
//! - `ForecastRequest`, `ForecastResponse`, `ComprehensiveForecast`: forecasting
//! - ML insight records (`CapacityPlan`, `FraudSignal`, `Hotspot`, ...), each
//!   normalized from its raw wire form
//! - `HealthStatus`, `MlStatus`: backend status checks

pub mod analytics;
pub mod forecast;
pub mod geo;
pub mod insights;
mod lenient;
pub mod location;
pub mod status;

pub use analytics::{
    BiometricSummary, DemographicSummary, EnrollmentSummary, Kpis, RegionCount, TrendKind,
    TrendPoint,
};
pub use forecast::{ComprehensiveForecast, ForecastPoint, ForecastRequest, ForecastResponse};
pub use geo::{Anomaly, HeatmapPoint, Severity};
pub use insights::{
    CapacityPlan, ClusterAssignment, ComparedRegion, FraudSignal, Hotspot, MbuProjection,
    MonthlyComparison, RankingEntry, UnderservedArea,
};
pub use location::{LocationFilter, SimulationDate, ViewContext, ALL_INDIA, DATE_FORMAT};
pub use status::{HealthStatus, MlStatus};
