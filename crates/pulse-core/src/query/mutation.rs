use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::api::ApiError;

use super::QueryError;

type Runner<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, ApiError>> + Send + Sync>;

struct MutationState<O> {
    /// Sequence number of the most recent invocation.
    latest: u64,
    pending: bool,
    data: Option<Arc<O>>,
    error: Option<QueryError>,
}

impl<O> Default for MutationState<O> {
    fn default() -> Self {
        Self {
            latest: 0,
            pending: false,
            data: None,
            error: None,
        }
    }
}

#[derive(Debug)]
pub struct MutationSnapshot<O> {
    pub is_pending: bool,
    pub data: Option<Arc<O>>,
    pub error: Option<QueryError>,
}

impl<O> MutationSnapshot<O> {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_idle(&self) -> bool {
        !self.is_pending && self.data.is_none() && self.error.is_none()
    }
}

/// A manually triggered operation, such as generating a forecast.
///
/// Invocations may overlap. Every caller gets its own outcome back, but the
/// shared state (`snapshot`) only ever reflects the most recent invocation:
/// an older one that resolves late is dropped.
pub struct Mutation<I, O> {
    run: Runner<I, O>,
    state: Arc<Mutex<MutationState<O>>>,
}

impl<I, O> Clone for Mutation<I, O> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
            state: Arc::clone(&self.state),
        }
    }
}

impl<I: Send + 'static, O: Send + Sync + 'static> Mutation<I, O> {
    pub fn new<F, Fut>(run: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, ApiError>> + Send + 'static,
    {
        Self {
            run: Arc::new(move |input| run(input).boxed()),
            state: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MutationState<O>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start an invocation. It runs to completion even if the returned
    /// future is dropped. Must be called from within a Tokio runtime.
    pub fn mutate(
        &self,
        input: I,
    ) -> impl Future<Output = Result<Arc<O>, QueryError>> + Send + 'static {
        let seq = {
            let mut state = self.lock();
            state.latest += 1;
            state.pending = true;
            state.latest
        };

        let fut = (self.run)(input);
        let shared = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            let result = fut.await.map(Arc::new).map_err(QueryError::from);

            let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if state.latest != seq {
                debug!(seq, latest = state.latest, "Discarding superseded mutation result");
                return result;
            }
            state.pending = false;
            match &result {
                Ok(data) => {
                    state.data = Some(Arc::clone(data));
                    state.error = None;
                }
                Err(e) => {
                    warn!(error = %e, "Mutation failed");
                    state.data = None;
                    state.error = Some(e.clone());
                }
            }
            result
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(QueryError::Aborted(e.to_string())))
        }
    }

    pub fn snapshot(&self) -> MutationSnapshot<O> {
        let state = self.lock();
        MutationSnapshot {
            is_pending: state.pending,
            data: state.data.clone(),
            error: state.error.clone(),
        }
    }

    /// Back to idle. Invocations still running will not commit.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.latest += 1;
        state.pending = false;
        state.data = None;
        state.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    type Gated = (u32, oneshot::Receiver<()>);

    fn gated_mutation() -> Mutation<Gated, u32> {
        Mutation::new(|(value, gate): Gated| async move {
            let _ = gate.await;
            if value == 0 {
                return Err(ApiError::Status {
                    status: 422,
                    body: "district required".to_string(),
                });
            }
            Ok(value)
        })
    }

    #[tokio::test]
    async fn test_latest_commits_when_older_resolves_last() {
        let mutation = gated_mutation();
        let (release_first, first_gate) = oneshot::channel();
        let (release_second, second_gate) = oneshot::channel();

        let first = mutation.mutate((1, first_gate));
        let second = mutation.mutate((2, second_gate));
        assert!(mutation.snapshot().is_pending);

        release_second.send(()).unwrap();
        assert_eq!(*second.await.unwrap(), 2);
        release_first.send(()).unwrap();
        assert_eq!(*first.await.unwrap(), 1);

        let snapshot = mutation.snapshot();
        assert!(!snapshot.is_pending);
        assert_eq!(snapshot.data.as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn test_latest_commits_when_older_resolves_first() {
        let mutation = gated_mutation();
        let (release_first, first_gate) = oneshot::channel();
        let (release_second, second_gate) = oneshot::channel();

        let first = mutation.mutate((1, first_gate));
        let second = mutation.mutate((2, second_gate));

        release_first.send(()).unwrap();
        first.await.unwrap();
        let snapshot = mutation.snapshot();
        assert!(snapshot.is_pending);
        assert!(snapshot.data.is_none());

        release_second.send(()).unwrap();
        second.await.unwrap();
        assert_eq!(mutation.snapshot().data.as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn test_error_visible_then_reset() {
        let mutation = gated_mutation();
        let (release, gate) = oneshot::channel();
        let call = mutation.mutate((0, gate));
        release.send(()).unwrap();

        let err = call.await.unwrap_err();
        assert_eq!(err.api_error().and_then(|e| e.status()), Some(422));
        let snapshot = mutation.snapshot();
        assert!(snapshot.is_error());
        assert!(!snapshot.is_pending);

        mutation.reset();
        assert!(mutation.snapshot().is_idle());
    }

    #[tokio::test]
    async fn test_reset_discards_running_invocation() {
        let mutation = gated_mutation();
        let (release, gate) = oneshot::channel();
        let call = mutation.mutate((5, gate));

        mutation.reset();
        release.send(()).unwrap();
        assert_eq!(*call.await.unwrap(), 5);
        assert!(mutation.snapshot().is_idle());
    }
}
