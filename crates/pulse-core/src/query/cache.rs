//! The shared query cache.
//!
//! Entries are keyed by `QueryKey` and hold type-erased results so every
//! resource can share one map. A fetch runs as its own task and writes its
//! outcome back into the entry, so dropping the caller never strands an
//! entry in `Pending`. Each started fetch takes a new generation number;
//! an outcome whose generation is no longer current is discarded.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::Config;

use super::{QueryError, QueryKey};

/// Default window in which a successful result is served without refetching.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(300);

/// Default idle time before an unobserved entry is removed.
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(300);

type AnyValue = Arc<dyn Any + Send + Sync>;
type FetchResult = Result<AnyValue, QueryError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;
type Entries = Arc<Mutex<HashMap<QueryKey, Entry>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    pub stale_time: Duration,
    pub gc_time: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            gc_time: DEFAULT_GC_TIME,
        }
    }
}

impl CacheOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stale_time: config.stale_time(),
            gc_time: config.gc_time(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Pending,
    Success,
    Error,
}

struct Entry {
    status: QueryStatus,
    data: Option<AnyValue>,
    error: Option<QueryError>,
    updated_at: Option<Instant>,
    invalidated: bool,
    in_flight: Option<SharedFetch>,
    generation: u64,
    subscribers: usize,
    last_used: Instant,
}

impl Entry {
    fn new(now: Instant) -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            updated_at: None,
            invalidated: false,
            in_flight: None,
            generation: 0,
            subscribers: 0,
            last_used: now,
        }
    }

    fn is_fresh(&self, stale_time: Duration, now: Instant) -> bool {
        self.status == QueryStatus::Success
            && !self.invalidated
            && self
                .updated_at
                .is_some_and(|at| now.saturating_duration_since(at) < stale_time)
    }

    fn is_collectable(&self, gc_time: Duration, now: Instant) -> bool {
        self.subscribers == 0
            && self.in_flight.is_none()
            && now.saturating_duration_since(self.last_used) >= gc_time
    }
}

/// What a caller sees for one key at one moment.
#[derive(Debug)]
pub struct QuerySnapshot<T> {
    pub status: QueryStatus,
    /// Last successful result; kept while a refetch is in flight.
    pub data: Option<Arc<T>>,
    pub error: Option<QueryError>,
    pub is_fetching: bool,
    pub updated_at: Option<Instant>,
}

impl<T> Clone for QuerySnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            updated_at: self.updated_at,
        }
    }
}

impl<T> QuerySnapshot<T> {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_fetching: false,
            updated_at: None,
        }
    }

    /// No data yet and not failed: fetch in flight or not started.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.status != QueryStatus::Error
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

/// Keeps an entry alive while held. Dropping it starts the entry's idle clock.
pub struct Subscription {
    entries: Entries,
    key: QueryKey,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut entries = lock(&self.entries);
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            entry.last_used = Instant::now();
        }
    }
}

enum Step {
    Ready(AnyValue),
    Wait(SharedFetch),
}

fn lock(entries: &Mutex<HashMap<QueryKey, Entry>>) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

fn downcast<T: Send + Sync + 'static>(
    key: &QueryKey,
    value: AnyValue,
) -> Result<Arc<T>, QueryError> {
    value
        .downcast::<T>()
        .map_err(|_| QueryError::TypeMismatch(key.to_string()))
}

/// Shared, deduplicating cache of query results.
/// Clone is cheap and every clone sees the same entries.
#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Entries,
    options: CacheOptions,
}

impl QueryCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            entries: Arc::default(),
            options,
        }
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    /// Return the result for `key`, calling `fetcher` only when needed.
    ///
    /// A fresh success is returned as is. A fetch already in flight for the
    /// same key is joined rather than repeated. Otherwise `fetcher` starts a
    /// new fetch whose outcome every concurrent caller shares.
    ///
    /// `fetcher` is invoked while the cache is locked; it should only build
    /// its future.
    pub async fn fetch<T, F, Fut, E>(
        &self,
        key: &QueryKey,
        fetcher: F,
    ) -> Result<Arc<T>, QueryError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<QueryError> + Send + 'static,
    {
        self.run(key, fetcher, false).await
    }

    /// Start a new fetch for `key` even if a fresh result or an in-flight
    /// fetch exists. The previous in-flight outcome will not be committed.
    pub async fn refetch<T, F, Fut, E>(
        &self,
        key: &QueryKey,
        fetcher: F,
    ) -> Result<Arc<T>, QueryError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<QueryError> + Send + 'static,
    {
        self.run(key, fetcher, true).await
    }

    async fn run<T, F, Fut, E>(
        &self,
        key: &QueryKey,
        fetcher: F,
        force: bool,
    ) -> Result<Arc<T>, QueryError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<QueryError> + Send + 'static,
    {
        let shared = match self.begin(key, fetcher, force) {
            Step::Ready(value) => return downcast(key, value),
            Step::Wait(shared) => shared,
        };
        downcast(key, shared.await?)
    }

    fn begin<T, F, Fut, E>(&self, key: &QueryKey, fetcher: F, force: bool) -> Step
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<QueryError> + Send + 'static,
    {
        let now = Instant::now();
        let mut entries = lock(&self.entries);
        Self::collect_locked(&mut entries, self.options.gc_time, now);

        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(now));
        entry.last_used = now;

        if !force {
            if entry.is_fresh(self.options.stale_time, now) {
                if let Some(data) = &entry.data {
                    debug!(key = %key, "Query cache hit");
                    return Step::Ready(Arc::clone(data));
                }
            }
            if let Some(in_flight) = &entry.in_flight {
                debug!(key = %key, "Joining in-flight query");
                return Step::Wait(in_flight.clone());
            }
        }

        entry.generation += 1;
        entry.status = QueryStatus::Pending;
        entry.invalidated = false;
        debug!(key = %key, generation = entry.generation, "Starting query fetch");

        let shared = Self::spawn_fetch(
            Arc::clone(&self.entries),
            key.clone(),
            entry.generation,
            fetcher(),
        );
        entry.in_flight = Some(shared.clone());
        Step::Wait(shared)
    }

    fn spawn_fetch<T, Fut, E>(
        entries: Entries,
        key: QueryKey,
        generation: u64,
        fut: Fut,
    ) -> SharedFetch
    where
        T: Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<QueryError> + Send + 'static,
    {
        let task_entries = Arc::clone(&entries);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let result: FetchResult = match fut.await {
                Ok(value) => Ok(Arc::new(value) as AnyValue),
                Err(e) => Err(e.into()),
            };
            Self::commit(&task_entries, &task_key, generation, &result);
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let result = Err(QueryError::Aborted(e.to_string()));
                    Self::commit(&entries, &key, generation, &result);
                    result
                }
            }
        }
        .boxed()
        .shared()
    }

    fn commit(
        entries: &Mutex<HashMap<QueryKey, Entry>>,
        key: &QueryKey,
        generation: u64,
        result: &FetchResult,
    ) {
        let mut entries = lock(entries);
        let Some(entry) = entries.get_mut(key) else {
            debug!(key = %key, "Query entry removed before fetch completed");
            return;
        };
        if entry.generation != generation {
            debug!(
                key = %key,
                generation,
                current = entry.generation,
                "Discarding superseded query result"
            );
            return;
        }

        let now = Instant::now();
        entry.in_flight = None;
        entry.updated_at = Some(now);
        match result {
            Ok(value) => {
                entry.status = QueryStatus::Success;
                entry.data = Some(Arc::clone(value));
                entry.error = None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Query failed");
                entry.status = QueryStatus::Error;
                entry.error = Some(e.clone());
            }
        }
    }

    /// Mark `key` stale and drop any in-flight fetch so its outcome is
    /// never committed. The next `fetch` goes to the network.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut entries = lock(&self.entries);
        if let Some(entry) = entries.get_mut(key) {
            entry.generation += 1;
            entry.invalidated = true;
            if entry.in_flight.take().is_some() {
                entry.status = if entry.data.is_some() {
                    QueryStatus::Success
                } else {
                    QueryStatus::Idle
                };
            }
            debug!(key = %key, "Query invalidated");
        }
    }

    /// Invalidate every key for one resource name.
    pub fn invalidate_resource(&self, resource: &str) {
        let keys: Vec<QueryKey> = lock(&self.entries)
            .keys()
            .filter(|k| k.resource() == resource)
            .cloned()
            .collect();
        for key in &keys {
            self.invalidate(key);
        }
    }

    pub fn snapshot<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QuerySnapshot<T> {
        let entries = lock(&self.entries);
        let Some(entry) = entries.get(key) else {
            return QuerySnapshot::idle();
        };

        let (data, error) = match entry.data.clone().map(|v| downcast::<T>(key, v)) {
            Some(Ok(data)) => (Some(data), entry.error.clone()),
            Some(Err(e)) => (None, Some(e)),
            None => (None, entry.error.clone()),
        };

        QuerySnapshot {
            status: entry.status,
            data,
            error,
            is_fetching: entry.in_flight.is_some(),
            updated_at: entry.updated_at,
        }
    }

    /// Register interest in `key`; the entry is not collected while any
    /// subscription is alive.
    pub fn subscribe(&self, key: &QueryKey) -> Subscription {
        let now = Instant::now();
        let mut entries = lock(&self.entries);
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(now));
        entry.subscribers += 1;
        entry.last_used = now;
        Subscription {
            entries: Arc::clone(&self.entries),
            key: key.clone(),
        }
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        lock(&self.entries)
            .get(key)
            .map(|e| e.subscribers)
            .unwrap_or(0)
    }

    /// Remove unobserved entries idle for longer than the gc time.
    /// Returns how many were removed.
    pub fn collect_garbage(&self) -> usize {
        let mut entries = lock(&self.entries);
        Self::collect_locked(&mut entries, self.options.gc_time, Instant::now())
    }

    fn collect_locked(entries: &mut HashMap<QueryKey, Entry>, gc_time: Duration, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_collectable(gc_time, now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Collected idle query entries");
        }
        removed
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        lock(&self.entries).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn key(name: &str) -> QueryKey {
        QueryKey::new(name).date(Default::default())
    }

    fn counted<Fut>(calls: &Arc<AtomicUsize>, fut: Fut) -> impl FnOnce() -> Fut {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            fut
        }
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            status: 500,
            body: "boom".to_string(),
        }
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_call() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel::<()>();
        let k = key("kpis");

        let (a, b, _) = tokio::join!(
            cache.fetch(&k, counted(&calls, async move {
                let _ = rx.await;
                Ok::<_, ApiError>(7u32)
            })),
            cache.fetch(&k, counted(&calls, async { Ok::<_, ApiError>(8u32) })),
            async {
                tokio::task::yield_now().await;
                let _ = tx.send(());
            }
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(*a, 7);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fresh_result_not_refetched() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let k = key("kpis");

        cache.fetch(&k, counted(&calls, async { Ok::<_, ApiError>(1u32) })).await.unwrap();
        let again = cache.fetch(&k, counted(&calls, async { Ok::<_, ApiError>(2u32) })).await.unwrap();

        assert_eq!(*again, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.snapshot::<u32>(&k).is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_result_refetched() {
        let cache = QueryCache::new(CacheOptions {
            stale_time: Duration::from_secs(60),
            gc_time: Duration::from_secs(600),
        });
        let calls = Arc::new(AtomicUsize::new(0));
        let k = key("kpis");

        cache.fetch(&k, counted(&calls, async { Ok::<_, ApiError>(1u32) })).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        cache.fetch(&k, counted(&calls, async { Ok::<_, ApiError>(2u32) })).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        let value = cache.fetch(&k, counted(&calls, async { Ok::<_, ApiError>(3u32) })).await.unwrap();
        assert_eq!(*value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_changed_key_fetches_again() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let goa = key("summary").state(Some("Goa"));
        let kerala = key("summary").state(Some("Kerala"));

        cache.fetch(&goa, counted(&calls, async { Ok::<_, ApiError>(1u32) })).await.unwrap();
        cache.fetch(&kerala, counted(&calls, async { Ok::<_, ApiError>(2u32) })).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*cache.snapshot::<u32>(&goa).data.unwrap(), 1);
        assert_eq!(*cache.snapshot::<u32>(&kerala).data.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_error_isolated_to_its_entry() {
        let cache = QueryCache::default();
        let ok = key("kpis");
        let bad = key("trends");

        cache.fetch(&ok, || async { Ok::<_, ApiError>(1u32) }).await.unwrap();
        let err = cache
            .fetch(&bad, || async { Err::<u32, _>(server_error()) })
            .await
            .unwrap_err();

        assert_eq!(err.api_error().and_then(|e| e.status()), Some(500));
        let failed = cache.snapshot::<u32>(&bad);
        assert!(failed.is_error());
        assert!(!failed.is_loading());
        assert!(cache.snapshot::<u32>(&ok).is_success());
    }

    #[tokio::test]
    async fn test_failed_entry_refetched_on_next_fetch() {
        let cache = QueryCache::default();
        let k = key("kpis");

        let _ = cache.fetch(&k, || async { Err::<u32, _>(server_error()) }).await;
        let value = cache.fetch(&k, || async { Ok::<_, ApiError>(4u32) }).await.unwrap();

        assert_eq!(*value, 4);
        let snapshot = cache.snapshot::<u32>(&k);
        assert!(snapshot.is_success());
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_data_retained_during_refetch() {
        let cache = QueryCache::default();
        let k = key("kpis");
        cache.fetch(&k, || async { Ok::<_, ApiError>(1u32) }).await.unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        let background = tokio::spawn({
            let cache = cache.clone();
            let k = k.clone();
            async move {
                cache
                    .refetch(&k, || async move {
                        let _ = rx.await;
                        Ok::<_, ApiError>(2u32)
                    })
                    .await
            }
        });
        while !cache.snapshot::<u32>(&k).is_fetching {
            tokio::task::yield_now().await;
        }

        let during = cache.snapshot::<u32>(&k);
        assert_eq!(during.status, QueryStatus::Pending);
        assert_eq!(during.data.as_deref(), Some(&1));
        assert!(!during.is_loading());

        tx.send(()).unwrap();
        background.await.unwrap().unwrap();
        assert_eq!(cache.snapshot::<u32>(&k).data.as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn test_invalidated_in_flight_result_discarded() {
        let cache = QueryCache::default();
        let k = key("kpis");
        let (tx, rx) = oneshot::channel::<()>();

        let slow = tokio::spawn({
            let cache = cache.clone();
            let k = k.clone();
            async move {
                cache
                    .fetch(&k, || async move {
                        let _ = rx.await;
                        Ok::<_, ApiError>(1u32)
                    })
                    .await
            }
        });
        while !cache.snapshot::<u32>(&k).is_fetching {
            tokio::task::yield_now().await;
        }

        cache.invalidate(&k);
        let fresh = cache.fetch(&k, || async { Ok::<_, ApiError>(2u32) }).await.unwrap();
        assert_eq!(*fresh, 2);

        tx.send(()).unwrap();
        assert_eq!(*slow.await.unwrap().unwrap(), 1);
        assert_eq!(cache.snapshot::<u32>(&k).data.as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn test_dropped_caller_still_commits() {
        let cache = QueryCache::default();
        let k = key("kpis");
        let (tx, rx) = oneshot::channel::<()>();

        {
            let fut = cache.fetch(&k, || async move {
                let _ = rx.await;
                Ok::<_, ApiError>(9u32)
            });
            futures::pin_mut!(fut);
            assert!(futures::poll!(fut.as_mut()).is_pending());
        }

        tx.send(()).unwrap();
        while cache.snapshot::<u32>(&k).is_fetching {
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.snapshot::<u32>(&k).data.as_deref(), Some(&9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_removes_only_idle_unobserved_entries() {
        let cache = QueryCache::new(CacheOptions {
            stale_time: Duration::from_secs(10),
            gc_time: Duration::from_secs(60),
        });
        let watched = key("watched");
        let idle = key("idle");

        let subscription = cache.subscribe(&watched);
        cache.fetch(&watched, || async { Ok::<_, ApiError>(1u32) }).await.unwrap();
        cache.fetch(&idle, || async { Ok::<_, ApiError>(2u32) }).await.unwrap();
        assert_eq!(cache.subscriber_count(&watched), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.collect_garbage(), 1);
        assert!(cache.contains(&watched));
        assert!(!cache.contains(&idle));

        drop(subscription);
        assert_eq!(cache.collect_garbage(), 0);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.collect_garbage(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_type_mismatch_reported() {
        let cache = QueryCache::default();
        let k = key("kpis");
        cache.fetch(&k, || async { Ok::<_, ApiError>(1u32) }).await.unwrap();

        let err = cache
            .fetch(&k, || async { Ok::<_, ApiError>("text".to_string()) })
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch(_)));
        assert!(cache.snapshot::<String>(&k).error.is_some());
    }

    #[test]
    fn test_unknown_key_is_idle_and_loading() {
        let cache = QueryCache::default();
        let snapshot = cache.snapshot::<u32>(&key("nothing"));
        assert_eq!(snapshot.status, QueryStatus::Idle);
        assert!(snapshot.is_loading());
        assert!(!snapshot.is_fetching);
    }
}
