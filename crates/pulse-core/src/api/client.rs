//! API client for the Aadhaar Pulse analytics backend.
//!
//! Each `fetch_*` method maps one backend resource to a typed result. Reads
//! are GET with query parameters; forecast generation is POST with a JSON
//! body. Failures propagate as `ApiError` without retries.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::location::LocationSource;
use crate::models::{
    Anomaly, BiometricSummary, CapacityPlan, ClusterAssignment, ComparedRegion,
    ComprehensiveForecast, DemographicSummary, EnrollmentSummary, ForecastRequest,
    ForecastResponse, FraudSignal, HealthStatus, HeatmapPoint, Hotspot, Kpis, LocationFilter,
    MbuProjection, MlStatus, MonthlyComparison, RankingEntry, SimulationDate, TrendKind,
    TrendPoint, UnderservedArea,
};

use super::{unwrap_list, ApiError, QueryParams};

/// HTTP request timeout in seconds, used when no config is supplied.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

type Result<T> = std::result::Result<T, ApiError>;

/// API client for the analytics backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
}

impl ApiClient {
    /// Create a client for `base_url` with the default timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_timeout(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_body<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::invalid_response(path, e))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &QueryParams) -> Result<T> {
        let url = self.url(path);
        debug!(url = %url, params = ?params.pairs(), "GET");

        let response = self
            .client
            .get(&url)
            .query(params.pairs())
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_body(path, response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        debug!(url = %url, "POST");

        let response = self.client.post(&url).json(body).send().await?;

        let response = Self::check_response(response).await?;
        Self::parse_body(path, response).await
    }

    /// GET a list endpoint and unwrap its envelope.
    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
        envelope: &str,
    ) -> Result<Vec<T>> {
        let body: Value = self.get(path, params).await?;
        Ok(unwrap_list(body, envelope))
    }

    // ===== Status =====

    pub async fn fetch_health(&self) -> Result<HealthStatus> {
        self.get("/api/health", &QueryParams::new()).await
    }

    pub async fn fetch_ml_status(&self) -> Result<MlStatus> {
        self.get("/api/ml-v2/status", &QueryParams::new()).await
    }

    // ===== Headline analytics =====

    pub async fn fetch_kpis(&self, date: SimulationDate) -> Result<Kpis> {
        self.get("/api/analytics/kpis", &QueryParams::dated(date)).await
    }

    pub async fn fetch_enrollment_summary(
        &self,
        date: SimulationDate,
        filter: &LocationFilter,
    ) -> Result<EnrollmentSummary> {
        let params = QueryParams::dated(date).location(filter);
        self.get("/api/enrollment/summary", &params).await
    }

    pub async fn fetch_demographic_summary(
        &self,
        date: SimulationDate,
        filter: &LocationFilter,
    ) -> Result<DemographicSummary> {
        let params = QueryParams::dated(date).location(filter);
        self.get("/api/demographic/summary", &params).await
    }

    pub async fn fetch_biometric_summary(
        &self,
        date: SimulationDate,
        filter: &LocationFilter,
    ) -> Result<BiometricSummary> {
        let params = QueryParams::dated(date).location(filter);
        self.get("/api/biometric/summary", &params).await
    }

    pub async fn fetch_trends(
        &self,
        kind: TrendKind,
        date: SimulationDate,
        filter: &LocationFilter,
    ) -> Result<Vec<TrendPoint>> {
        let path = format!("/api/{}/trends", kind.as_str());
        let params = QueryParams::dated(date).location(filter);
        self.get_list(&path, &params, "data").await
    }

    // ===== Geospatial & anomalies =====

    pub async fn fetch_heatmap(
        &self,
        kind: TrendKind,
        date: SimulationDate,
    ) -> Result<Vec<HeatmapPoint>> {
        let path = format!("/api/geospatial/heatmap/{}", kind.as_str());
        self.get_list(&path, &QueryParams::dated(date), "locations")
            .await
    }

    pub async fn fetch_anomalies(
        &self,
        date: SimulationDate,
        filter: &LocationFilter,
    ) -> Result<Vec<Anomaly>> {
        let params = QueryParams::dated(date).state_only(filter);
        self.get_list("/api/anomaly/detect", &params, "anomalies")
            .await
    }

    // ===== Forecasts =====

    pub async fn generate_forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        self.post("/api/forecast/mbu", request).await
    }

    pub async fn generate_comprehensive_forecast(
        &self,
        request: &ForecastRequest,
    ) -> Result<ComprehensiveForecast> {
        self.post("/api/forecast/comprehensive", request).await
    }

    // ===== Location lists =====

    pub async fn fetch_states(&self) -> Result<Vec<String>> {
        self.get_list("/api/enrollment/states", &QueryParams::new(), "states")
            .await
    }

    pub async fn fetch_districts(&self, state: &str) -> Result<Vec<String>> {
        let params = QueryParams::new().push("state", state);
        self.get_list("/api/enrollment/districts", &params, "districts")
            .await
    }

    // ===== ML insights =====

    pub async fn fetch_capacity(
        &self,
        date: SimulationDate,
        filter: &LocationFilter,
    ) -> Result<Vec<CapacityPlan>> {
        let params = QueryParams::dated(date).location(filter);
        self.get_list("/api/ml-v2/capacity", &params, "districts")
            .await
    }

    pub async fn fetch_underserved(
        &self,
        date: SimulationDate,
        filter: &LocationFilter,
        limit: Option<u32>,
    ) -> Result<Vec<UnderservedArea>> {
        let params = QueryParams::dated(date)
            .state_only(filter)
            .push_opt("limit", limit);
        self.get_list("/api/ml-v2/underserved", &params, "areas")
            .await
    }

    pub async fn fetch_fraud(
        &self,
        date: SimulationDate,
        filter: &LocationFilter,
        top_n: Option<u32>,
    ) -> Result<Vec<FraudSignal>> {
        let params = QueryParams::dated(date)
            .location(filter)
            .push_opt("top_n", top_n);
        self.get_list("/api/ml-v2/fraud", &params, "signals").await
    }

    pub async fn fetch_clustering(
        &self,
        date: SimulationDate,
        level: Option<&str>,
    ) -> Result<Vec<ClusterAssignment>> {
        let params = QueryParams::dated(date).push_opt("level", level);
        self.get_list("/api/ml-v2/clustering", &params, "clusters")
            .await
    }

    pub async fn fetch_hotspots(
        &self,
        date: SimulationDate,
        filter: &LocationFilter,
        period: Option<&str>,
    ) -> Result<Vec<Hotspot>> {
        let params = QueryParams::dated(date)
            .state_only(filter)
            .push_opt("period", period);
        self.get_list("/api/ml-v2/hotspots", &params, "hotspots")
            .await
    }

    pub async fn fetch_mbu_projection(
        &self,
        date: SimulationDate,
        filter: &LocationFilter,
    ) -> Result<Vec<MbuProjection>> {
        let params = QueryParams::dated(date).location(filter);
        self.get_list("/api/ml-v2/mbu-projection", &params, "projections")
            .await
    }

    pub async fn fetch_rankings(
        &self,
        date: SimulationDate,
        metric: &str,
        level: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<RankingEntry>> {
        let params = QueryParams::dated(date)
            .push_opt("metric", Some(metric))
            .push_opt("level", level)
            .push_opt("limit", limit);
        self.get_list("/api/ml-v2/rankings", &params, "rankings")
            .await
    }

    pub async fn fetch_compare(
        &self,
        date: SimulationDate,
        filter: &LocationFilter,
        metric: Option<&str>,
    ) -> Result<Vec<ComparedRegion>> {
        let params = QueryParams::dated(date)
            .location(filter)
            .push_opt("metric", metric);
        self.get_list("/api/ml-v2/compare", &params, "regions").await
    }

    pub async fn fetch_monthly_comparison(
        &self,
        date: SimulationDate,
        filter: &LocationFilter,
        metric: Option<&str>,
    ) -> Result<Vec<MonthlyComparison>> {
        let params = QueryParams::dated(date)
            .location(filter)
            .push_opt("metric", metric);
        self.get_list("/api/ml-v2/monthly-comparison", &params, "months")
            .await
    }
}

impl LocationSource for ApiClient {
    fn states(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(self.fetch_states())
    }

    fn districts<'a>(&'a self, state: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
        Box::pin(self.fetch_districts(state))
    }
}
