//! Core library for Aadhaar Pulse.
//!
//! Provides the pieces every dashboard screen is built from:
//!
//! - `api`: typed HTTP client for the analytics backend
//! - `models`: wire and domain types for each backend resource
//! - `location`: the active state/district filter and its option lists
//! - `query`: keyed, deduplicating async cache with observer/mutation handles
//! - `dashboard`: per-panel query facade that builds keys from a `ViewContext`
//! - `estimates`: client-side approximations, kept apart from fetched data

pub mod api;
pub mod config;
pub mod dashboard;
pub mod estimates;
pub mod location;
pub mod models;
pub mod query;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use dashboard::{Dashboard, Overview};
pub use location::{LocationContext, LocationSource};
pub use models::{LocationFilter, SimulationDate, ViewContext};
pub use query::{Mutation, QueryCache, QueryError, QueryKey, QueryObserver};
