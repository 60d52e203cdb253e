use std::sync::Arc;

use thiserror::Error;

use crate::api::ApiError;

/// Failure observed by every subscriber of one query.
///
/// Cloneable so a single failed fetch can be handed to all waiters.
#[derive(Error, Debug, Clone)]
pub enum QueryError {
    #[error(transparent)]
    Fetch(Arc<ApiError>),

    #[error("Query task stopped before completing: {0}")]
    Aborted(String),

    #[error("Cached value for {0} has a different type")]
    TypeMismatch(String),
}

impl From<ApiError> for QueryError {
    fn from(e: ApiError) -> Self {
        QueryError::Fetch(Arc::new(e))
    }
}

impl QueryError {
    /// The underlying API error, when the fetch itself failed.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            QueryError::Fetch(e) => Some(e),
            _ => None,
        }
    }
}
