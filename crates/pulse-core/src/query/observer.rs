use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use super::{QueryCache, QueryError, QueryKey, QuerySnapshot, Subscription};

/// One consumer's view of a query whose key can change over time.
///
/// Holds a subscription on the current key only. `snapshot` always reads
/// the current key, so when the key changes while a fetch for the previous
/// key is still running, that older result lands in the cache under its own
/// key and never shows up here.
pub struct QueryObserver<T> {
    cache: QueryCache,
    key: QueryKey,
    subscription: Subscription,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> QueryObserver<T> {
    pub fn new(cache: &QueryCache, key: QueryKey) -> Self {
        let subscription = cache.subscribe(&key);
        Self {
            cache: cache.clone(),
            key,
            subscription,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Point the observer at `key`. Returns false if it already was.
    pub fn set_key(&mut self, key: QueryKey) -> bool {
        if key == self.key {
            return false;
        }
        debug!(from = %self.key, to = %key, "Observer key changed");
        self.subscription = self.cache.subscribe(&key);
        self.key = key;
        true
    }

    /// Fetch for the key current at call time.
    ///
    /// The returned future owns everything it needs and can be spawned.
    pub fn fetch<F, Fut, E>(
        &self,
        fetcher: F,
    ) -> impl Future<Output = Result<Arc<T>, QueryError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<QueryError> + Send + 'static,
    {
        let cache = self.cache.clone();
        let key = self.key.clone();
        async move { cache.fetch(&key, fetcher).await }
    }

    /// Like `fetch` but bypasses a fresh result or an in-flight fetch.
    pub fn refetch<F, Fut, E>(
        &self,
        fetcher: F,
    ) -> impl Future<Output = Result<Arc<T>, QueryError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<QueryError> + Send + 'static,
    {
        let cache = self.cache.clone();
        let key = self.key.clone();
        async move { cache.refetch(&key, fetcher).await }
    }

    pub fn invalidate(&self) {
        self.cache.invalidate(&self.key);
    }

    pub fn snapshot(&self) -> QuerySnapshot<T> {
        self.cache.snapshot(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::{LocationFilter, SimulationDate, ViewContext};
    use tokio::sync::oneshot;

    fn summary_key(state: &str) -> QueryKey {
        let view = ViewContext::new(SimulationDate::default(), LocationFilter::for_state(state));
        QueryKey::scoped("enrollment-summary", &view)
    }

    #[tokio::test]
    async fn test_last_key_wins() {
        let cache = QueryCache::default();
        let mut observer = QueryObserver::<String>::new(&cache, summary_key("Goa"));

        let (release_goa, goa_gate) = oneshot::channel::<()>();
        let goa = tokio::spawn(observer.fetch(|| async move {
            let _ = goa_gate.await;
            Ok::<_, ApiError>("goa".to_string())
        }));
        while !observer.snapshot().is_fetching {
            tokio::task::yield_now().await;
        }

        assert!(observer.set_key(summary_key("Kerala")));
        observer
            .fetch(|| async { Ok::<_, ApiError>("kerala".to_string()) })
            .await
            .unwrap();

        release_goa.send(()).unwrap();
        goa.await.unwrap().unwrap();

        assert_eq!(observer.snapshot().data.as_deref().map(String::as_str), Some("kerala"));
        assert_eq!(
            cache.snapshot::<String>(&summary_key("Goa")).data.as_deref().map(String::as_str),
            Some("goa")
        );
    }

    #[tokio::test]
    async fn test_set_key_moves_subscription() {
        let cache = QueryCache::default();
        let mut observer = QueryObserver::<u32>::new(&cache, summary_key("Goa"));
        assert_eq!(cache.subscriber_count(&summary_key("Goa")), 1);

        assert!(!observer.set_key(summary_key("Goa")));
        assert!(observer.set_key(summary_key("Kerala")));

        assert_eq!(cache.subscriber_count(&summary_key("Goa")), 0);
        assert_eq!(cache.subscriber_count(&summary_key("Kerala")), 1);

        drop(observer);
        assert_eq!(cache.subscriber_count(&summary_key("Kerala")), 0);
    }

    #[tokio::test]
    async fn test_new_key_starts_loading() {
        let cache = QueryCache::default();
        let mut observer = QueryObserver::<u32>::new(&cache, summary_key("Goa"));
        observer.fetch(|| async { Ok::<_, ApiError>(1) }).await.unwrap();
        assert!(observer.snapshot().is_success());

        observer.set_key(summary_key("Kerala"));
        let snapshot = observer.snapshot();
        assert!(snapshot.is_loading());
        assert!(snapshot.data.is_none());
    }
}
