//! Keyed, deduplicating asynchronous query cache.
//!
//! - `QueryKey`: value-equal identity of one cacheable request
//! - `QueryCache`: shared entries with in-flight deduplication, a stale
//!   window and idle garbage collection
//! - `QueryObserver`: one panel's view of whichever key it currently wants
//! - `Mutation`: manually triggered operation where only the latest
//!   invocation commits
//!
//! Entry lifecycle: `Idle -> Pending -> {Success, Error}`, and back to
//! `Pending` on key change, explicit refetch or staleness.

pub mod cache;
pub mod error;
pub mod key;
pub mod mutation;
pub mod observer;

pub use cache::{CacheOptions, QueryCache, QuerySnapshot, QueryStatus, Subscription};
pub use error::QueryError;
pub use key::QueryKey;
pub use mutation::{Mutation, MutationSnapshot};
pub use observer::QueryObserver;
