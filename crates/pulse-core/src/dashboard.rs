//! Per-panel query facade.
//!
//! Every panel method takes the `ViewContext` it renders for, builds the
//! panel's `QueryKey` from only the parameters that request actually sends,
//! and runs the API call through the shared `QueryCache`. Panels fail
//! independently: a failed panel never affects another panel's result.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiClient, ApiError};
use crate::config::Config;
use crate::location::LocationContext;
use crate::models::{
    Anomaly, BiometricSummary, CapacityPlan, ClusterAssignment, ComparedRegion,
    ComprehensiveForecast, DemographicSummary, EnrollmentSummary, ForecastRequest,
    ForecastResponse, FraudSignal, HealthStatus, HeatmapPoint, Hotspot, Kpis, MbuProjection,
    MlStatus, MonthlyComparison, RankingEntry, TrendKind, TrendPoint, UnderservedArea,
    ViewContext,
};
use crate::query::{CacheOptions, Mutation, QueryCache, QueryError, QueryKey, QueryObserver};

/// Row limit for ranked insight lists.
pub const DEFAULT_LIST_LIMIT: u32 = 10;

/// Ranking metric shown when none is picked.
pub const DEFAULT_RANKING_METRIC: &str = "total_enrollments";

pub type PanelResult<T> = Result<Arc<T>, QueryError>;

/// Query key builders. Public so observers can track the same entries the
/// panel methods fill.
pub mod keys {
    use super::*;

    pub fn health() -> QueryKey {
        QueryKey::new("health")
    }

    pub fn ml_status() -> QueryKey {
        QueryKey::new("ml-status")
    }

    pub fn kpis(view: &ViewContext) -> QueryKey {
        QueryKey::new("kpis").date(view.date)
    }

    pub fn summary(kind: TrendKind, view: &ViewContext) -> QueryKey {
        QueryKey::scoped(format!("{}-summary", kind.as_str()), view)
    }

    pub fn trends(kind: TrendKind, view: &ViewContext) -> QueryKey {
        QueryKey::scoped(format!("{}-trends", kind.as_str()), view)
    }

    pub fn heatmap(kind: TrendKind, view: &ViewContext) -> QueryKey {
        QueryKey::new("heatmap").date(view.date).param("kind", kind)
    }

    pub fn anomalies(view: &ViewContext) -> QueryKey {
        QueryKey::new("anomalies")
            .date(view.date)
            .state(view.filter.state())
    }

    pub fn states() -> QueryKey {
        QueryKey::new("states")
    }

    pub fn districts(state: &str) -> QueryKey {
        QueryKey::new("districts").state(Some(state))
    }

    pub fn capacity(view: &ViewContext) -> QueryKey {
        QueryKey::scoped("capacity", view)
    }

    pub fn underserved(view: &ViewContext, limit: Option<u32>) -> QueryKey {
        QueryKey::new("underserved")
            .date(view.date)
            .state(view.filter.state())
            .param_opt("limit", limit)
    }

    pub fn fraud(view: &ViewContext, top_n: Option<u32>) -> QueryKey {
        QueryKey::scoped("fraud", view).param_opt("top_n", top_n)
    }

    pub fn clustering(view: &ViewContext, level: Option<&str>) -> QueryKey {
        QueryKey::new("clustering")
            .date(view.date)
            .param_opt("level", level)
    }

    pub fn hotspots(view: &ViewContext, period: Option<&str>) -> QueryKey {
        QueryKey::new("hotspots")
            .date(view.date)
            .state(view.filter.state())
            .param_opt("period", period)
    }

    pub fn mbu_projection(view: &ViewContext) -> QueryKey {
        QueryKey::scoped("mbu-projection", view)
    }

    pub fn rankings(
        view: &ViewContext,
        metric: &str,
        level: Option<&str>,
        limit: Option<u32>,
    ) -> QueryKey {
        QueryKey::new("rankings")
            .date(view.date)
            .param("metric", metric)
            .param_opt("level", level)
            .param_opt("limit", limit)
    }

    pub fn compare(view: &ViewContext, metric: Option<&str>) -> QueryKey {
        QueryKey::scoped("compare", view).param_opt("metric", metric)
    }

    pub fn monthly_comparison(view: &ViewContext, metric: Option<&str>) -> QueryKey {
        QueryKey::scoped("monthly-comparison", view).param_opt("metric", metric)
    }
}

/// The overview screen: KPIs plus each stream's summary and trend.
#[derive(Debug)]
pub struct Overview {
    pub kpis: PanelResult<Kpis>,
    pub enrollment: PanelResult<EnrollmentSummary>,
    pub demographic: PanelResult<DemographicSummary>,
    pub biometric: PanelResult<BiometricSummary>,
    pub enrollment_trend: PanelResult<Vec<TrendPoint>>,
    pub demographic_trend: PanelResult<Vec<TrendPoint>>,
    pub biometric_trend: PanelResult<Vec<TrendPoint>>,
}

impl Overview {
    pub fn failed_panels(&self) -> usize {
        [
            self.kpis.is_err(),
            self.enrollment.is_err(),
            self.demographic.is_err(),
            self.biometric.is_err(),
            self.enrollment_trend.is_err(),
            self.demographic_trend.is_err(),
            self.biometric_trend.is_err(),
        ]
        .into_iter()
        .filter(|failed| *failed)
        .count()
    }
}

/// The ML insights screen.
#[derive(Debug)]
pub struct Insights {
    pub capacity: PanelResult<Vec<CapacityPlan>>,
    pub underserved: PanelResult<Vec<UnderservedArea>>,
    pub fraud: PanelResult<Vec<FraudSignal>>,
    pub hotspots: PanelResult<Vec<Hotspot>>,
    pub mbu_projection: PanelResult<Vec<MbuProjection>>,
    pub rankings: PanelResult<Vec<RankingEntry>>,
}

/// Entry point for every screen.
#[derive(Clone)]
pub struct Dashboard {
    api: ApiClient,
    cache: QueryCache,
    forecast: Mutation<ForecastRequest, ForecastResponse>,
    comprehensive_forecast: Mutation<ForecastRequest, ComprehensiveForecast>,
}

impl Dashboard {
    pub fn new(api: ApiClient, cache: QueryCache) -> Self {
        let forecast = {
            let api = api.clone();
            Mutation::new(move |request: ForecastRequest| {
                let api = api.clone();
                async move { api.generate_forecast(&request).await }
            })
        };
        let comprehensive_forecast = {
            let api = api.clone();
            Mutation::new(move |request: ForecastRequest| {
                let api = api.clone();
                async move { api.generate_comprehensive_forecast(&request).await }
            })
        };

        Self {
            api,
            cache,
            forecast,
            comprehensive_forecast,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let api = ApiClient::from_config(config)?;
        Ok(Self::new(api, QueryCache::new(CacheOptions::from_config(config))))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// A location context fed by this dashboard's API client.
    pub fn location_context(&self) -> LocationContext {
        LocationContext::new(Arc::new(self.api.clone()))
    }

    /// An observer over `key` in this dashboard's cache.
    pub fn observe<T: Send + Sync + 'static>(&self, key: QueryKey) -> QueryObserver<T> {
        QueryObserver::new(&self.cache, key)
    }

    async fn query<T, F, Fut>(&self, key: QueryKey, call: F) -> PanelResult<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        debug!(key = %key, "Panel query");
        let api = self.api.clone();
        self.cache.fetch(&key, move || call(api)).await
    }

    // ===== Status =====

    pub async fn health(&self) -> PanelResult<HealthStatus> {
        self.query(keys::health(), |api| async move { api.fetch_health().await })
            .await
    }

    pub async fn ml_status(&self) -> PanelResult<MlStatus> {
        self.query(keys::ml_status(), |api| async move { api.fetch_ml_status().await })
            .await
    }

    // ===== Headline analytics =====

    pub async fn kpis(&self, view: &ViewContext) -> PanelResult<Kpis> {
        let date = view.date;
        self.query(keys::kpis(view), move |api| async move { api.fetch_kpis(date).await })
            .await
    }

    pub async fn enrollment_summary(&self, view: &ViewContext) -> PanelResult<EnrollmentSummary> {
        let (date, filter) = (view.date, view.filter.clone());
        self.query(keys::summary(TrendKind::Enrollment, view), move |api| async move {
            api.fetch_enrollment_summary(date, &filter).await
        })
        .await
    }

    pub async fn demographic_summary(&self, view: &ViewContext) -> PanelResult<DemographicSummary> {
        let (date, filter) = (view.date, view.filter.clone());
        self.query(keys::summary(TrendKind::Demographic, view), move |api| async move {
            api.fetch_demographic_summary(date, &filter).await
        })
        .await
    }

    pub async fn biometric_summary(&self, view: &ViewContext) -> PanelResult<BiometricSummary> {
        let (date, filter) = (view.date, view.filter.clone());
        self.query(keys::summary(TrendKind::Biometric, view), move |api| async move {
            api.fetch_biometric_summary(date, &filter).await
        })
        .await
    }

    pub async fn trends(
        &self,
        kind: TrendKind,
        view: &ViewContext,
    ) -> PanelResult<Vec<TrendPoint>> {
        let (date, filter) = (view.date, view.filter.clone());
        self.query(keys::trends(kind, view), move |api| async move {
            api.fetch_trends(kind, date, &filter).await
        })
        .await
    }

    /// All overview panels, issued concurrently.
    pub async fn overview(&self, view: &ViewContext) -> Overview {
        let (
            kpis,
            enrollment,
            demographic,
            biometric,
            enrollment_trend,
            demographic_trend,
            biometric_trend,
        ) = tokio::join!(
            self.kpis(view),
            self.enrollment_summary(view),
            self.demographic_summary(view),
            self.biometric_summary(view),
            self.trends(TrendKind::Enrollment, view),
            self.trends(TrendKind::Demographic, view),
            self.trends(TrendKind::Biometric, view),
        );

        Overview {
            kpis,
            enrollment,
            demographic,
            biometric,
            enrollment_trend,
            demographic_trend,
            biometric_trend,
        }
    }

    // ===== Geospatial & anomalies =====

    pub async fn heatmap(
        &self,
        kind: TrendKind,
        view: &ViewContext,
    ) -> PanelResult<Vec<HeatmapPoint>> {
        let date = view.date;
        self.query(keys::heatmap(kind, view), move |api| async move {
            api.fetch_heatmap(kind, date).await
        })
        .await
    }

    pub async fn anomalies(&self, view: &ViewContext) -> PanelResult<Vec<Anomaly>> {
        let (date, filter) = (view.date, view.filter.clone());
        self.query(keys::anomalies(view), move |api| async move {
            api.fetch_anomalies(date, &filter).await
        })
        .await
    }

    // ===== Location lists =====

    pub async fn states(&self) -> PanelResult<Vec<String>> {
        self.query(keys::states(), |api| async move { api.fetch_states().await })
            .await
    }

    pub async fn districts(&self, state: &str) -> PanelResult<Vec<String>> {
        let owned = state.to_string();
        self.query(keys::districts(state), move |api| async move {
            api.fetch_districts(&owned).await
        })
        .await
    }

    // ===== ML insights =====

    pub async fn capacity(&self, view: &ViewContext) -> PanelResult<Vec<CapacityPlan>> {
        let (date, filter) = (view.date, view.filter.clone());
        self.query(keys::capacity(view), move |api| async move {
            api.fetch_capacity(date, &filter).await
        })
        .await
    }

    pub async fn underserved(
        &self,
        view: &ViewContext,
        limit: Option<u32>,
    ) -> PanelResult<Vec<UnderservedArea>> {
        let (date, filter) = (view.date, view.filter.clone());
        self.query(keys::underserved(view, limit), move |api| async move {
            api.fetch_underserved(date, &filter, limit).await
        })
        .await
    }

    pub async fn fraud(
        &self,
        view: &ViewContext,
        top_n: Option<u32>,
    ) -> PanelResult<Vec<FraudSignal>> {
        let (date, filter) = (view.date, view.filter.clone());
        self.query(keys::fraud(view, top_n), move |api| async move {
            api.fetch_fraud(date, &filter, top_n).await
        })
        .await
    }

    pub async fn clustering(
        &self,
        view: &ViewContext,
        level: Option<&str>,
    ) -> PanelResult<Vec<ClusterAssignment>> {
        let date = view.date;
        let level_owned = level.map(str::to_string);
        self.query(keys::clustering(view, level), move |api| async move {
            api.fetch_clustering(date, level_owned.as_deref()).await
        })
        .await
    }

    pub async fn hotspots(
        &self,
        view: &ViewContext,
        period: Option<&str>,
    ) -> PanelResult<Vec<Hotspot>> {
        let (date, filter) = (view.date, view.filter.clone());
        let period_owned = period.map(str::to_string);
        self.query(keys::hotspots(view, period), move |api| async move {
            api.fetch_hotspots(date, &filter, period_owned.as_deref()).await
        })
        .await
    }

    pub async fn mbu_projection(&self, view: &ViewContext) -> PanelResult<Vec<MbuProjection>> {
        let (date, filter) = (view.date, view.filter.clone());
        self.query(keys::mbu_projection(view), move |api| async move {
            api.fetch_mbu_projection(date, &filter).await
        })
        .await
    }

    pub async fn rankings(
        &self,
        view: &ViewContext,
        metric: &str,
        level: Option<&str>,
        limit: Option<u32>,
    ) -> PanelResult<Vec<RankingEntry>> {
        let date = view.date;
        let metric_owned = metric.to_string();
        let level_owned = level.map(str::to_string);
        self.query(keys::rankings(view, metric, level, limit), move |api| async move {
            api.fetch_rankings(date, &metric_owned, level_owned.as_deref(), limit)
                .await
        })
        .await
    }

    pub async fn compare(
        &self,
        view: &ViewContext,
        metric: Option<&str>,
    ) -> PanelResult<Vec<ComparedRegion>> {
        let (date, filter) = (view.date, view.filter.clone());
        let metric_owned = metric.map(str::to_string);
        self.query(keys::compare(view, metric), move |api| async move {
            api.fetch_compare(date, &filter, metric_owned.as_deref()).await
        })
        .await
    }

    pub async fn monthly_comparison(
        &self,
        view: &ViewContext,
        metric: Option<&str>,
    ) -> PanelResult<Vec<MonthlyComparison>> {
        let (date, filter) = (view.date, view.filter.clone());
        let metric_owned = metric.map(str::to_string);
        self.query(keys::monthly_comparison(view, metric), move |api| async move {
            api.fetch_monthly_comparison(date, &filter, metric_owned.as_deref())
                .await
        })
        .await
    }

    /// The insights screen with default limits, issued concurrently.
    pub async fn insights(&self, view: &ViewContext) -> Insights {
        let (capacity, underserved, fraud, hotspots, mbu_projection, rankings) = tokio::join!(
            self.capacity(view),
            self.underserved(view, Some(DEFAULT_LIST_LIMIT)),
            self.fraud(view, Some(DEFAULT_LIST_LIMIT)),
            self.hotspots(view, None),
            self.mbu_projection(view),
            self.rankings(view, DEFAULT_RANKING_METRIC, None, Some(DEFAULT_LIST_LIMIT)),
        );

        Insights {
            capacity,
            underserved,
            fraud,
            hotspots,
            mbu_projection,
            rankings,
        }
    }

    // ===== Forecasts =====

    /// The single-stream forecast generator. Only the most recently
    /// requested forecast is ever shown in its snapshot.
    pub fn forecast(&self) -> &Mutation<ForecastRequest, ForecastResponse> {
        &self.forecast
    }

    pub fn comprehensive_forecast(&self) -> &Mutation<ForecastRequest, ComprehensiveForecast> {
        &self.comprehensive_forecast
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LocationFilter, SimulationDate};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `body` with `status` to every connection and counts requests.
    async fn serve_forever(status: u16, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn view(state: Option<&str>) -> ViewContext {
        ViewContext::new(
            SimulationDate::default(),
            LocationFilter::default().with_state(state.map(str::to_string)),
        )
    }

    fn dashboard(base_url: &str) -> Dashboard {
        Dashboard::new(ApiClient::new(base_url).unwrap(), QueryCache::default())
    }

    #[test]
    fn test_keys_only_carry_sent_parameters() {
        let goa = view(Some("Goa"));
        let kerala = view(Some("Kerala"));

        assert_eq!(keys::kpis(&goa), keys::kpis(&kerala));
        assert_eq!(
            keys::heatmap(TrendKind::Biometric, &goa),
            keys::heatmap(TrendKind::Biometric, &kerala)
        );
        assert_ne!(keys::summary(TrendKind::Enrollment, &goa), keys::summary(TrendKind::Enrollment, &kerala));
        assert_ne!(
            keys::summary(TrendKind::Enrollment, &goa),
            keys::summary(TrendKind::Biometric, &goa)
        );

        let with_district = ViewContext::new(
            goa.date,
            goa.filter.clone().with_district(Some("North Goa".into())),
        );
        assert_eq!(keys::anomalies(&goa), keys::anomalies(&with_district));
        assert_ne!(keys::capacity(&goa), keys::capacity(&with_district));
    }

    #[tokio::test]
    async fn test_repeated_panel_served_from_cache() {
        let (url, hits) = serve_forever(200, r#"{"total_enrollments": 10}"#).await;
        let dashboard = dashboard(&url);
        let view = view(None);

        let first = dashboard.kpis(&view).await.unwrap();
        let second = dashboard.kpis(&view).await.unwrap();

        assert_eq!(first.total_enrollments, 10);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_location_change_refetches() {
        let (url, hits) = serve_forever(200, r#"{"total": 5}"#).await;
        let dashboard = dashboard(&url);

        dashboard.enrollment_summary(&view(Some("Goa"))).await.unwrap();
        dashboard.enrollment_summary(&view(Some("Kerala"))).await.unwrap();
        dashboard.enrollment_summary(&view(Some("Goa"))).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_overview_panels_fail_independently() {
        let (url, _) = serve_forever(503, r#"{"detail": "warming up"}"#).await;
        let dashboard = dashboard(&url);

        let overview = dashboard.overview(&view(None)).await;

        assert_eq!(overview.failed_panels(), 7);
        let err = overview.kpis.unwrap_err();
        assert_eq!(err.api_error().and_then(|e| e.status()), Some(503));
        assert!(dashboard.cache().snapshot::<Kpis>(&keys::kpis(&view(None))).is_error());
    }

    #[tokio::test]
    async fn test_forecast_mutation_posts() {
        let (url, hits) = serve_forever(
            200,
            r#"{"district": "Pune", "forecast": [{"date": "2025-12-16", "yhat": 12.5}]}"#,
        )
        .await;
        let dashboard = dashboard(&url);

        let request = ForecastRequest::new("Pune", SimulationDate::default());
        let response = dashboard.forecast().mutate(request).await.unwrap();

        assert_eq!(response.district, "Pune");
        assert_eq!(response.total_predicted(), 12.5);
        assert_eq!(dashboard.forecast().snapshot().data.as_deref(), Some(&*response));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
