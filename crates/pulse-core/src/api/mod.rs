//! REST API client module for the Aadhaar Pulse analytics backend.
//!
//! This module provides the `ApiClient` for fetching pre-computed
//! statistics, forecasts and ML insights. The client is a pure
//! request/response mapping: no caching, no retries, and HTTP status
//! codes are passed through untouched.

pub mod client;
pub mod envelope;
pub mod error;
pub mod params;

pub use client::ApiClient;
pub use envelope::unwrap_list;
pub use error::ApiError;
pub use params::QueryParams;
